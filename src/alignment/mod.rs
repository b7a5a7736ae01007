pub mod beam;
pub mod hmm;
pub mod observation;
pub mod posterior;
