// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Context implementations.
//!
//! A context implements the adapters the vault reaches external systems
//! through. The only implementation in this crate is the in-memory one,
//! used for tests and development. The service crate provides the
//! network-backed one.
pub mod memory;
