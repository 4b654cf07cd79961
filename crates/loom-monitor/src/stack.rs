// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack text for captured panics.
//!
//! Collectors display `stack` verbatim, so backtraces are reduced to
//! application frames in a compact `at function (file:line:col)` form.

use std::backtrace::Backtrace;

use rustc_demangle::demangle;

/// Frames belonging to the standard library, runtimes or this SDK.
const SYSTEM_PREFIXES: &[&str] = &[
	"std::",
	"core::",
	"alloc::",
	"<std::",
	"<core::",
	"<alloc::",
	"tokio::",
	"<tokio::",
	"futures::",
	"<futures::",
	"backtrace::",
	"loom_monitor::",
	"loom_monitor_core::",
	"<loom_monitor",
	"rust_begin_unwind",
	"rust_panic",
	"__rust_",
	"_rust_",
];

const SYSTEM_CONTAINS: &[&str] = &[
	"::panic::",
	"::panicking::",
	"::rt::",
	"::sys_common::",
	"::backtrace::",
];

#[derive(Debug, PartialEq, Eq)]
struct StackFrame {
	function: String,
	location: Option<String>,
}

/// Captures the current backtrace as stack text, or `None` if no
/// application frames could be resolved.
pub fn capture_stack() -> Option<String> {
	format_backtrace(&Backtrace::force_capture())
}

pub fn format_backtrace(backtrace: &Backtrace) -> Option<String> {
	format_stack(&backtrace.to_string())
}

fn format_stack(raw: &str) -> Option<String> {
	let lines: Vec<String> = parse_frames(raw)
		.into_iter()
		.filter(|frame| is_in_app_frame(&frame.function))
		.map(|frame| match frame.location {
			Some(location) => format!("    at {} ({})", frame.function, location),
			None => format!("    at {}", frame.function),
		})
		.collect();

	if lines.is_empty() {
		None
	} else {
		Some(lines.join("\n"))
	}
}

/// Parses `N: symbol` lines, attaching a following `at file:line:col` line
/// to the frame before it.
fn parse_frames(raw: &str) -> Vec<StackFrame> {
	let mut frames: Vec<StackFrame> = Vec::new();

	for line in raw.lines() {
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		if let Some(location) = line.strip_prefix("at ") {
			if let Some(last) = frames.last_mut() {
				if last.location.is_none() {
					last.location = Some(location.trim().to_string());
				}
			}
			continue;
		}

		let Some((index, symbol)) = line.split_once(':') else {
			continue;
		};
		if index.trim().parse::<u32>().is_err() {
			continue;
		}

		let symbol = symbol.trim();
		if symbol.is_empty() {
			continue;
		}

		frames.push(StackFrame {
			function: demangle(symbol).to_string(),
			location: None,
		});
	}

	frames
}

fn is_in_app_frame(function: &str) -> bool {
	if SYSTEM_PREFIXES
		.iter()
		.any(|prefix| function.starts_with(prefix))
	{
		return false;
	}

	!SYSTEM_CONTAINS
		.iter()
		.any(|needle| function.contains(needle))
}
