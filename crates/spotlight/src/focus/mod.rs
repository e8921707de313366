#![forbid(unsafe_code)]

//! Focus management: node table, spatial search, container memory, and the
//! manager that ties them together.

pub mod accelerator;
pub mod container;
pub mod decorator;
pub mod deferred;
pub mod event;
pub mod manager;
pub mod spatial;
pub mod tree;

pub use accelerator::{Accelerator, AcceleratorConfig, KeyDecision};
pub use container::{ContainerMemory, ContainerRecord, ContainerRoute};
pub use decorator::{
    CONTAINER_KIND, Decorator, DecoratorRegistry, FocusRequest, HandlerContext, HighlightSink,
    Propagation,
};
pub use deferred::{DeferredQueue, DeferredTask};
pub use event::{FocusEvent, FocusEventKind, FocusOrigin};
pub use manager::FocusManager;
pub use tree::{Capability, Direction, FocusId, FocusNode, FocusTree};
