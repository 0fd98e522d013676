mod core;

pub use core::{
    Dispatcher, ErrorHook, HandlerRequest, HandlerResponse, HandlerSender, HeaderVec,
    MAX_INLINE_HEADERS,
};
