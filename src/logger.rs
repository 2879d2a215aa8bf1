//SPDX-License-Identifier: MIT OR Apache-2.0
use crate::Level;
use crate::log_record::LogRecord;
use std::fmt::Debug;

/**
A destination for log records; the counterpart of a handler in other logging systems.

Loggers are attached to a [crate::LogSink], which calls [Logger::finish_log_record]
for every record that passed the sink's level check and filters.
*/
pub trait Logger: Debug + Send + Sync {
    /**
        Submits the log record for logging.
    */
    fn finish_log_record(&self, record: &LogRecord);

    /**
    The lowest level this logger accepts.  Records below it are not submitted.
    */
    fn level(&self) -> Level {
        Level::Debug
    }

    /**
    The application may imminently exit.  Ensure all buffers are flushed and up to date.
    */
    fn prepare_to_die(&self);
}

/*
Boilerplate notes.

# Logger

I don't think Clone on Logger makes sense, so copy's out.
PartialEq and Eq are possible but it's a little unclear if we mean data equality or some kind of provenance-based thing.
Sinks detach loggers by Arc identity for exactly that reason.
Default is not necessarily sensible since who knows how the logger is constructed (does it need a formatter, etc.)
Send/Sync is required: one logger serves every thread that logs through its sink.
*/
