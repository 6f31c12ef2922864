pub mod codegen;
pub mod ledger;
pub mod otp;
pub mod scan;
pub mod session_code;
pub mod sweep;
pub mod token;
