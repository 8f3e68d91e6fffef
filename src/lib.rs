//! Turn an Augeas-parsed config file into an `augtool` set-script whose
//! paths identify records by content instead of by ordinal position.

pub mod aug;
pub mod config;
pub mod explain;
pub mod suggest;
