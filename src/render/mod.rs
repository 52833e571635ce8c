//! Render projection.
//!
//! [`RenderProjector`] folds [`ThinkEvent`]s into a [`RenderDocument`] (the
//! reasoning blocks in opening order plus the answer text) and turns it into
//! a display string through a [`BlockRenderer`].
//!
//! The display is recomputed from the whole document on every update, which
//! is linear in the output so far. That is fine for chat-sized answers.

mod renderer;

pub use renderer::{BlockRenderer, BlockView, HtmlRenderer, PlainRenderer};

use crate::streaming::{BlockId, ThinkEvent};
use std::collections::HashMap;

/// One reasoning block as seen by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkBlock {
    pub id: BlockId,
    pub content: String,
    /// False once the closing marker was seen. Never reopens.
    pub open: bool,
}

/// Reasoning blocks in opening order plus the trailing answer text.
#[derive(Debug, Clone, Default)]
pub struct RenderDocument {
    blocks: Vec<ThinkBlock>,
    index: HashMap<BlockId, usize>,
    tail: String,
}

impl RenderDocument {
    /// Blocks in the order they were opened.
    pub fn blocks(&self) -> &[ThinkBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&ThinkBlock> {
        self.index.get(&id).map(|&i| &self.blocks[i])
    }

    /// Accumulated answer text.
    pub fn tail(&self) -> &str {
        &self.tail
    }

    pub fn has_open_block(&self) -> bool {
        self.blocks.iter().any(|b| b.open)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.tail.is_empty()
    }

    /// Render the live view: open blocks and the answer carry a cursor.
    pub fn display<R: BlockRenderer + ?Sized>(&self, renderer: &R) -> String {
        render(self, renderer, true)
    }

    /// Render the final view: every block closed, no cursors.
    ///
    /// Blocks whose closing marker never arrived are presented as closed too.
    pub fn finalize<R: BlockRenderer + ?Sized>(&self, renderer: &R) -> String {
        render(self, renderer, false)
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut ThinkBlock> {
        let i = *self.index.get(&id)?;
        self.blocks.get_mut(i)
    }
}

/// Applies parser events to a document and renders it.
#[derive(Debug, Clone, Default)]
pub struct RenderProjector {
    document: RenderDocument,
}

impl RenderProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &RenderDocument {
        &self.document
    }

    pub fn into_document(self) -> RenderDocument {
        self.document
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &ThinkEvent) {
        match event {
            ThinkEvent::Text(text) => self.document.tail.push_str(text),
            ThinkEvent::ThinkOpen(id) => {
                let doc = &mut self.document;
                doc.index.insert(*id, doc.blocks.len());
                doc.blocks.push(ThinkBlock {
                    id: *id,
                    content: String::new(),
                    open: true,
                });
            }
            ThinkEvent::ThinkUpdate(id, delta) => match self.document.block_mut(*id) {
                Some(block) => block.content.push_str(delta),
                None => tracing::warn!(block = %id, "update for unknown think block"),
            },
            ThinkEvent::ThinkClose(id) => match self.document.block_mut(*id) {
                Some(block) => block.open = false,
                None => tracing::warn!(block = %id, "close for unknown think block"),
            },
        }
    }

    /// Apply a batch of events. Returns whether the document changed.
    pub fn apply_all(&mut self, events: &[ThinkEvent]) -> bool {
        for event in events {
            self.apply(event);
        }
        !events.is_empty()
    }

    pub fn display<R: BlockRenderer + ?Sized>(&self, renderer: &R) -> String {
        self.document.display(renderer)
    }

    pub fn finalize<R: BlockRenderer + ?Sized>(&self, renderer: &R) -> String {
        self.document.finalize(renderer)
    }

    /// Force every block closed, e.g. at end of stream.
    pub fn close_all(&mut self) {
        for block in &mut self.document.blocks {
            block.open = false;
        }
    }
}

fn render<R: BlockRenderer + ?Sized>(doc: &RenderDocument, renderer: &R, live: bool) -> String {
    let sections: Vec<String> = doc
        .blocks
        .iter()
        .map(|block| {
            let open = live && block.open;
            renderer.render_block(&BlockView {
                id: block.id,
                content: &block.content,
                open,
                cursor: open,
            })
        })
        .collect();

    let mut out = sections.join(renderer.block_separator());
    out.push_str(&doc.tail);
    if live && doc.has_open_block() {
        out.push_str(renderer.cursor());
    }
    out
}
