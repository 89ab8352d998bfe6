/// Marker trait for events routed by a [`Dispatcher`](crate::Dispatcher).
///
/// Events must be `Clone + Send + 'static` because they:
/// - Are queued and handed to worker threads (Send, 'static)
/// - Are fanned out to every handling registered for their type (Clone)
///
/// The trait is implemented for every type meeting these bounds, so any
/// plain struct or enum can be published without extra ceremony. A
/// `Debug` rendering is only needed when you want payloads in logs.
///
/// # Example
///
/// ```rust
/// use kestrel::Event;
///
/// #[derive(Clone, Debug)]
/// struct Progress(u32);
///
/// fn assert_event<E: Event>() {}
/// assert_event::<Progress>();
/// ```
pub trait Event: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Event for T {}
