pub mod dbdraw;
