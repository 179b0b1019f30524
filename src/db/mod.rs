mod mongodb;
mod seed;

pub use self::mongodb::MongoDB;
