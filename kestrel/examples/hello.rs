use std::{thread, time::Duration};

use kestrel::*;

// Define your events
#[derive(Clone, Debug)]
enum Greeting {
    Hello(String),
    Goodbye(String),
}

#[derive(Clone, Debug)]
struct Shout(String);

impl From<&str> for Shout {
    fn from(s: &str) -> Self {
        Shout(s.to_uppercase())
    }
}

fn main() -> Result {
    let dispatcher = Dispatcher::default();

    // One handling per event type is enough to start with
    dispatcher.add_handling("greeter", |g: Greeting| match g {
        Greeting::Hello(name) => println!("Hello, {name}!"),
        Greeting::Goodbye(name) => println!("Goodbye, {name}!"),
    })?;

    // Two handlings for the same type both receive every event,
    // the higher priority one is offered it first
    dispatcher
        .build_handling("echo", |s: Shout| println!("{}", s.0))
        .priority(Priority::High)
        .add()?;
    dispatcher.add_handling("counter", |s: Shout| println!("({} chars)", s.0.len()))?;

    dispatcher.publish(Greeting::Hello("World".into()))?;
    dispatcher.publish_from::<Shout, _>("kestrel")?;

    // Nobody listens for this one, so it is dropped with a warning
    let delivery = dispatcher.publish(42_u32)?;
    println!("u32 event: {delivery}");

    // A stopped handling keeps its events until it is started again
    dispatcher.stop::<Greeting>("greeter")?;
    dispatcher.publish(Greeting::Goodbye("World".into()))?;
    thread::sleep(Duration::from_millis(50));
    println!(
        "waiting in greeter: {:?}",
        dispatcher.occupied_in_queue::<Greeting>("greeter")
    );
    dispatcher.start::<Greeting>("greeter")?;
    thread::sleep(Duration::from_millis(50));

    // Dropping the dispatcher stops and joins every worker
    Ok(())
}
