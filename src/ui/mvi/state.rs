/// Marker trait for reducer state.
///
/// `PartialEq` lets a front-end skip rendering when an intent changed
/// nothing.
pub trait UiState: Clone + PartialEq + Default + Send + 'static {}
