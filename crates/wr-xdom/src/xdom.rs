//! Document root.

use crate::block::{Block, Parameters};
use crate::listener::{Event, Listener, Tag};

/// Position of a block: child indexes from the root downwards.
pub type BlockPath = Vec<usize>;

/// Root of a parsed document.
///
/// Blocks own their children; upward navigation goes through [`BlockPath`]s
/// ([`parent`](Self::parent)) instead of stored back-references.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Xdom {
    pub blocks: Vec<Block>,
    pub params: Parameters,
}

impl Xdom {
    #[must_use]
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            params: Parameters::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    /// Emit the whole document, bracketed by document start/end events.
    pub fn traverse(&self, listener: &mut dyn Listener) {
        listener.event(Event::Start(Tag::Document, &self.params));
        for block in &self.blocks {
            block.traverse(listener);
        }
        listener.event(Event::End(Tag::Document));
    }

    /// Block at `path`.
    #[must_use]
    pub fn get(&self, path: &[usize]) -> Option<&Block> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.blocks.get(*first)?, |block, &i| block.children.get(i))
    }

    /// Mutable block at `path`.
    pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get_mut(*first)?;
        for &i in rest {
            block = block.children.get_mut(i)?;
        }
        Some(block)
    }

    /// Parent of the block at `path`; `None` for top-level blocks.
    #[must_use]
    pub fn parent(&self, path: &[usize]) -> Option<&Block> {
        match path.len() {
            0 | 1 => None,
            n => self.get(&path[..n - 1]),
        }
    }

    /// Replace the block at `path`, returning the previous one.
    pub fn replace(&mut self, path: &[usize], block: Block) -> Option<Block> {
        let slot = self.get_mut(path)?;
        Some(std::mem::replace(slot, block))
    }

    /// Visit every block in pre-order (document order) with its path.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&[usize], &Block),
    {
        fn recurse<F: FnMut(&[usize], &Block)>(blocks: &[Block], path: &mut BlockPath, visit: &mut F) {
            for (i, block) in blocks.iter().enumerate() {
                path.push(i);
                visit(path, block);
                recurse(&block.children, path, visit);
                path.pop();
            }
        }
        recurse(&self.blocks, &mut Vec::new(), &mut visit);
    }

    /// Paths of all blocks matching `predicate`, in document order.
    pub fn find_all<P>(&self, predicate: P) -> Vec<BlockPath>
    where
        P: Fn(&Block) -> bool,
    {
        let mut found = Vec::new();
        self.walk(|path, block| {
            if predicate(block) {
                found.push(path.to_vec());
            }
        });
        found
    }

    /// Concatenated text of the document.
    #[must_use]
    pub fn text(&self) -> String {
        self.blocks.iter().map(Block::text).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockKind, Format};
    use crate::builder::XdomBuilder;
    use pretty_assertions::assert_eq;

    fn sample() -> Xdom {
        Xdom::new(vec![
            Block::heading(1, vec![Block::word("Title")]),
            Block::paragraph(vec![
                Block::word("Some"),
                Block::space(),
                Block::format(Format::Bold, vec![Block::word("bold")]),
            ]),
        ])
    }

    #[test]
    fn test_get_and_parent() {
        let xdom = sample();
        let bold_word = xdom.get(&[1, 2, 0]).unwrap();
        assert_eq!(bold_word.kind, BlockKind::Word("bold".to_owned()));

        let parent = xdom.parent(&[1, 2, 0]).unwrap();
        assert_eq!(parent.kind, BlockKind::Format(Format::Bold));
        assert!(xdom.parent(&[1]).is_none());
        assert!(xdom.get(&[5]).is_none());
        assert!(xdom.get(&[]).is_none());
    }

    #[test]
    fn test_walk_is_pre_order() {
        let xdom = sample();
        let mut names = Vec::new();
        xdom.walk(|_, block| names.push(block.kind.name()));
        assert_eq!(
            names,
            vec!["heading", "word", "paragraph", "word", "space", "format", "word"]
        );
    }

    #[test]
    fn test_find_all_and_replace() {
        let mut xdom = sample();
        let words = xdom.find_all(|b| matches!(b.kind, BlockKind::Word(_)));
        assert_eq!(words, vec![vec![0, 0], vec![1, 0], vec![1, 2, 0]]);

        let old = xdom.replace(&[1, 0], Block::word("Any")).unwrap();
        assert_eq!(old, Block::word("Some"));
        assert_eq!(xdom.text(), "Title\nAny bold");
    }

    #[test]
    fn test_traverse_rebuilds_same_tree() {
        let xdom = sample();
        let mut builder = XdomBuilder::new();
        xdom.traverse(&mut builder);
        assert_eq!(builder.finish().unwrap(), xdom);
    }
}
