//! This crate just encapsulates the `protobuf` definition of the Leaf
//! scheduler, and exports the generated types.
//!
//! The [`leaf`] module is checked-in `prost`/`tonic` codegen output for
//! `proto/leaf.proto` (client side only), so building does not require
//! `protoc`.

pub mod leaf;
