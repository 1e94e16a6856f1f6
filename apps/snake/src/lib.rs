use wasm_bindgen::prelude::*;
use folio_engine::*;

pub mod game;
pub mod snake;
use game::SnakeGame;

folio_web::export_game!(SnakeGame, "snake");
