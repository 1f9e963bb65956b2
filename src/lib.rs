#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

pub mod battery;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod display;
pub mod epd;
pub mod framebuffer;
pub mod http;
pub mod input;
pub mod layout;
pub mod network;
pub mod power;
pub mod schedule;
pub mod sleep;
pub mod wake;

#[cfg(test)]
mod mock;
