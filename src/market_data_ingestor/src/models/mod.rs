pub mod bar;
pub mod bar_series;
pub mod derived;
pub mod granularity;
pub mod request_params;
