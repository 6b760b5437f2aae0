//! Producer thread and pull-side resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use super::scanner::Scanner;
use super::token::{LexItem, Token};
use super::{LexResult, LexerOptions};

/// Replacement hook for alias resolution.
///
/// Called with each plain word that is not a keyword; returning `Some`
/// substitutes the returned item.
pub type AliasHook = Box<dyn FnMut(&LexItem) -> Option<LexItem> + Send>;

/// Shared flag telling the producer to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pull side of a running tokenizer.
///
/// Items arrive over a zero-capacity channel, so the producer is never more
/// than one item ahead. Dropping the stream cancels and joins the producer.
pub struct TokenStream {
    /// Resolution switches; read on every pull.
    pub options: LexerOptions,
    receiver: Option<Receiver<LexResult<LexItem>>>,
    producer: Option<JoinHandle<()>>,
    cancel: CancelHandle,
    alias_hook: Option<AliasHook>,
    finished: bool,
}

impl TokenStream {
    pub fn new(text: impl Into<String>, options: LexerOptions) -> Self {
        let text = text.into();
        let (sender, receiver) = mpsc::sync_channel(0);
        let cancel = CancelHandle::default();
        let producer_cancel = cancel.clone();

        let producer = thread::spawn(move || {
            for item in Scanner::new(text) {
                if producer_cancel.is_cancelled() || sender.send(item).is_err() {
                    tracing::trace!("lexer producer stopped early");
                    return;
                }
            }
        });

        Self {
            options,
            receiver: Some(receiver),
            producer: Some(producer),
            cancel,
            alias_hook: None,
            finished: false,
        }
    }

    pub fn set_alias_hook(&mut self, hook: AliasHook) {
        self.alias_hook = Some(hook);
    }

    /// A handle that can stop the producer from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop the producer. Later pulls return `None`.
    pub fn cancel(&mut self) {
        self.shutdown();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn shutdown(&mut self) {
        self.finished = true;
        self.cancel.cancel();
        // Dropping the receiver unblocks a producer parked in `send`.
        self.receiver.take();
        if let Some(producer) = self.producer.take()
            && let Err(payload) = producer.join()
            && !thread::panicking()
        {
            std::panic::resume_unwind(payload);
        }
    }

    fn resolve(&mut self, mut item: LexItem) -> LexItem {
        if !item.is_plain_word() {
            return item;
        }
        if self.options.resolve_keywords
            && let Some(keyword) = Token::keyword(&item.value)
        {
            item.token = keyword;
            return item;
        }
        if self.options.resolve_aliases
            && let Some(hook) = self.alias_hook.as_mut()
            && let Some(replacement) = hook(&item)
        {
            return replacement;
        }
        item
    }
}

impl Iterator for TokenStream {
    type Item = LexResult<LexItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.cancel.is_cancelled() {
            self.finished = true;
            return None;
        }
        loop {
            let received = self.receiver.as_ref()?.recv();
            let item = match received {
                Ok(Ok(item)) => item,
                Ok(Err(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                Err(_) => {
                    // Producer exited without an Eof: cancelled or panicked.
                    self.shutdown();
                    return None;
                }
            };

            match item.token {
                Token::Eof => {
                    self.finished = true;
                    return Some(Ok(item));
                }
                Token::NewLine if self.options.suppress_newlines => continue,
                _ => return Some(Ok(self.resolve(item))),
            }
        }
    }
}

impl Drop for TokenStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_stops_iteration() {
        let mut stream = TokenStream::new("a b c d e f", LexerOptions::default());
        assert!(stream.next().is_some());
        stream.cancel();
        assert!(stream.next().is_none());
        assert!(stream.is_finished());
    }

    #[test]
    fn cancel_handle_from_another_thread() {
        let mut stream = TokenStream::new("a b c", LexerOptions::default());
        let handle = stream.cancel_handle();
        thread::spawn(move || handle.cancel())
            .join()
            .expect("cancel thread");
        assert!(stream.next().is_none());
    }

    #[test]
    fn drop_mid_stream_joins_producer() {
        let mut stream = TokenStream::new("one two three four", LexerOptions::default());
        assert!(stream.next().is_some());
        drop(stream);
    }
}
