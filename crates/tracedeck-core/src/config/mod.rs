pub mod settings;

pub use settings::TraceConfig;
