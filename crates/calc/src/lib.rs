//! Calculation services for strictqa.
//!
//! Two small HTTP services answer questions the document index cannot:
//! a factorization service (`POST /factors`) and a general math service
//! (`POST /calculate`). Both take `{"question": "..."}` and reply with at
//! least `answer` and `success`.

pub mod expr;
pub mod factorization;
pub mod math;
pub mod server;

pub use factorization::{factorize, find_factors, Factorization};
pub use math::{solve, MathAnswer};
pub use server::{factorization_router, math_router, serve};
