#[cfg(not(target_endian = "little"))]
compile_error!("qazkey requires a little-endian platform");

pub mod api;
pub mod cache;
pub mod dict;
pub mod normalize;
pub mod predictor;
pub mod settings;
pub mod task_queue;
pub mod trace_init;
pub mod unicode;
pub mod user_dict;
