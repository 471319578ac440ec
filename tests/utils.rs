// SPDX-FileCopyrightText: 2024 embr <git@liclac.eu>
// SPDX-FileCopyrightText: 2024 Wavelens UG <info@wavelens.io>
//
// SPDX-License-Identifier: EUPL-1.2

use harness_log::{Logger, LoggerBuilder, MemorySink};

/// A development-profile builder writing to a fresh [`MemorySink`].
pub fn memory_builder() -> (MemorySink, LoggerBuilder) {
    let sink = MemorySink::new();
    let builder = Logger::builder().sink(sink.clone());
    (sink, builder)
}
