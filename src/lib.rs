//! Bridge between a Bluetooth chessboard and a UCI engine, with spoken
//! feedback, PGN files and a spectator web page.

pub mod board;
pub mod config;
pub mod console;
pub mod driver;
pub mod engine;
pub mod error;
pub mod game;
pub mod models;
pub mod persistence;
pub mod routes;
pub mod speech;
pub mod websocket;
