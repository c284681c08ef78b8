pub mod ports;
pub mod qualify_use_case;
pub mod resolve_use_case;
