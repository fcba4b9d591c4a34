pub mod cluster;
pub mod machine;
pub mod osccluster;
pub mod oscmachinetemplate;
