//! Reactive containers built on a synchronous publish/subscribe primitive.

pub mod array;
pub mod diagnostics;
pub mod notifier;
pub mod object;
pub mod source;
pub mod value;

pub use array::{ArrayAction, ArrayError, ArrayEvent, ObservableArray, ReadonlyObservableArray};
pub use diagnostics::{DiagnosticSink, FailureKind, RecordingSink, SubscriberFailure, TracingSink};
pub use notifier::{ActionTag, Observable, Subscriber, SubscriberResult, Subscription};
pub use object::{ObjectAction, ObjectEvent, ObservableObject};
pub use source::{Mapped, Source, SourceHandler, SourceId};
pub use value::{ObservableValue, Readyable, ValueAction};
