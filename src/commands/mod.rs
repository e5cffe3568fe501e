pub mod doctor;
pub mod expire;
pub mod refresh;
pub mod serve;
pub mod status;
