pub mod cpu_info;
pub mod load_average;
pub mod normalizer;
