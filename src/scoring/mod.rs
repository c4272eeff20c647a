pub mod recommend;
