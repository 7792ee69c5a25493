pub mod kflog;
