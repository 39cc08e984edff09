/// Receives user-facing error messages.
///
/// The renderer reports every failure exactly once. What the sink does with
/// a message (dialog, console, log file) is up to the application.
pub trait DiagnosticSink {
    fn report(&mut self, message: &str);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, message: &str) {
        (**self).report(message)
    }
}

/// Forwards messages to the `log` facade at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, message: &str) {
        log::error!("{message}");
    }
}

/// Collects messages in memory.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl DiagnosticSink for MessageLog {
    fn report(&mut self, message: &str) {
        self.messages.push(message.to_owned());
    }
}
