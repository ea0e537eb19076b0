#![allow(dead_code)]

pub mod wait;
