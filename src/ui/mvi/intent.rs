/// Marker trait for intents.
///
/// Intents are plain data. Anything a reducer would otherwise have to look
/// up, such as the clock, travels inside the intent so reduction stays pure.
pub trait Intent: Send + 'static {}
