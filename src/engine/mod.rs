pub mod progression;
pub mod materializer;
