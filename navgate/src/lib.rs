// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

pub mod classifier;
pub mod config;
pub mod console;
pub mod engine;
pub mod inflight;
pub mod interceptor;
pub mod normalize;
pub mod session;
pub mod surface;
pub mod verdict;
