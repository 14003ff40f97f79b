pub mod task;

pub use task::{
    decode_list, Category, CompleteTaskRequest, DecodeError, ListItem, ListKind, Priority,
    TaskActionRequest, TaskStatus,
};
