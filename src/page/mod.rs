//! The comparison page: run workflow and event rendering.

mod controller;
mod render;

pub use controller::{
    build_task_prompt, LiveBackend, PageController, RunBackend, RunForm, RunOutcome, RunPermit,
    COMPLETED_MESSAGE, DEFAULT_PRODUCT_1, DEFAULT_PRODUCT_2, MISSING_KEYS_MESSAGE,
    RUNNING_MESSAGE, SUMMARY_HEADING,
};
pub use render::{
    truncate_output, ChannelPage, LogBlock, LogKind, LogRenderer, MemoryPage, PageEvent,
    PageSink, TOOL_OUTPUT_LIMIT,
};
