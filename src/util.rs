pub mod lifo;
