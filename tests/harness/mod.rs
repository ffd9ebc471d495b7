// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test harness for the registry throttle.
//!
//! Provides admission schedule recording for property checks and a fake
//! registry endpoint for exercising the HTTP transport.

#![allow(dead_code)]

pub mod registry;
pub mod schedule;
