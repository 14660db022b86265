mod common;
mod view;
