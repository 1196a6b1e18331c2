#![cfg(test)]

mod layer;
