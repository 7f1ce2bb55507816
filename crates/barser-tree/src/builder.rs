//! Tree builder: the parser proper.
//!
//! Consumes the scanner's event stream and applies the arity-driven node
//! creation rules: a statement's accumulated tokens decide what gets
//! created when a terminator, block or array delimiter arrives. The
//! builder keeps the current insertion parent (`head`), a LIFO stack of
//! prior parents for block nesting, a fixed-size token cache, and the
//! statement-level modifier flags.

use barser_parse::{BsErrorKind, ScanEvent, ScanToken, Scanner, MAX_TOKENS};

use crate::dict::BsDict;
use crate::node::{flags, NodeId, NodeKind};
use crate::trace;

/// Modifier tokens: a first-position token ending in `:` that sets an
/// inheritable flag on the statement's top node.
const MODIFIERS: &[(&[u8], u32)] = &[(b"inactive:", flags::INACTIVE)];

fn modifier_flag(token: &[u8]) -> Option<u32> {
    MODIFIERS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|&(_, flag)| flag)
}

/// Parser state over a dictionary being built.
pub(crate) struct Builder<'d, 'buf> {
    dict: &'d mut BsDict,
    /// Current insertion parent.
    head: NodeId,
    /// Prior insertion parents, pushed on descent.
    stack: Vec<NodeId>,
    /// Token cache for the current statement, at most [`MAX_TOKENS`].
    cache: Vec<ScanToken<'buf>>,
    /// Number of leading cache entries absorbed as modifiers.
    token_offset: usize,
    /// Inheritable flags accumulated from modifiers this statement.
    stmt_flags: u32,
}

impl<'d, 'buf> Builder<'d, 'buf> {
    fn new(dict: &'d mut BsDict) -> Self {
        let head = dict.root();
        Builder {
            dict,
            head,
            stack: Vec::new(),
            cache: Vec::with_capacity(MAX_TOKENS),
            token_offset: 0,
            stmt_flags: 0,
        }
    }

    fn in_array(&self) -> bool {
        self.dict.node(self.head).kind == NodeKind::Array
    }

    /// Drain the effective tokens of the current statement.
    fn take_tokens(&mut self) -> Vec<ScanToken<'buf>> {
        let toks = self.cache.split_off(self.token_offset);
        self.cache.clear();
        self.token_offset = 0;
        toks
    }

    fn reset_statement(&mut self) {
        self.cache.clear();
        self.token_offset = 0;
        self.stmt_flags = 0;
    }

    /// Apply the statement's modifier flags to its top-most node. Runs
    /// before the statement's descendants are created so they inherit.
    fn apply_stmt_flags(&mut self, top: NodeId) {
        if self.stmt_flags != 0 {
            self.dict.node_mut(top).flags |= self.stmt_flags;
        }
    }

    fn name_flags(quoted: bool) -> u32 {
        if quoted {
            flags::QUOTED_NAME
        } else {
            0
        }
    }

    fn value_flags(quoted: bool) -> u32 {
        if quoted {
            flags::QUOTED_VALUE
        } else {
            0
        }
    }

    /// Create a named node under `parent` from a name token.
    fn create_named(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: ScanToken<'buf>,
    ) -> NodeId {
        let quoted = name.quoted;
        self.dict.create_raw(
            parent,
            kind,
            Some(name.into_owned()),
            None,
            Self::name_flags(quoted),
        )
    }

    /// Create an anonymous leaf carrying a token as its value (array
    /// members).
    fn create_value_leaf(&mut self, parent: NodeId, value: ScanToken<'buf>) -> NodeId {
        let quoted = value.quoted;
        let id = self.dict.create_raw(
            parent,
            NodeKind::Leaf,
            None,
            Some(value.into_owned()),
            Self::value_flags(quoted),
        );
        self.apply_stmt_flags(id);
        id
    }

    /// Probe `parent` for an existing child named by the token; reuse it
    /// (refreshing only its quoted-name flag) or create a node of `kind`.
    fn reuse_or_create(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: ScanToken<'buf>,
    ) -> NodeId {
        if let Some(existing) = self.dict.get_child(parent, name.bytes()) {
            let n = self.dict.node_mut(existing);
            if name.quoted {
                n.flags |= flags::QUOTED_NAME;
            } else {
                n.flags &= !flags::QUOTED_NAME;
            }
            existing
        } else {
            self.create_named(parent, kind, name)
        }
    }

    /// Flush all pending tokens as anonymous array leaves.
    fn flush_array_leaves(&mut self) {
        let toks = self.take_tokens();
        for tok in toks {
            self.create_value_leaf(self.head, tok);
        }
    }

    // ---- event handlers ------------------------------------------------

    fn on_token(&mut self, tok: ScanToken<'buf>) -> Result<(), BsErrorKind> {
        // a first-position token ending in ':' may be a modifier; it is
        // absorbed by advancing the offset rather than counted
        if self.cache.len() == self.token_offset && !tok.quoted {
            if let Some(flag) = modifier_flag(tok.bytes()) {
                trace!("modifier {:?}", tok.bytes());
                self.stmt_flags |= flag;
                self.cache.push(tok);
                self.token_offset += 1;
                return Ok(());
            }
        }

        if self.cache.len() == MAX_TOKENS {
            // arrays take tokens in batches; anything else has gone on
            // too long without a terminator
            if self.in_array() {
                self.flush_array_leaves();
            } else {
                return Err(BsErrorKind::Tokens);
            }
        }
        self.cache.push(tok);
        Ok(())
    }

    fn on_endval(&mut self) -> Result<(), BsErrorKind> {
        if self.in_array() {
            let mut toks = self.take_tokens();
            match toks.len() {
                0 => {}
                // array members are always anonymous: the last token is
                // the value, a stray name before it is dropped
                1 | 2 => {
                    let value = toks.pop().expect("token checked");
                    self.create_value_leaf(self.head, value);
                }
                _ => return Err(BsErrorKind::Tokens),
            }
            self.reset_statement();
            return Ok(());
        }

        let toks = self.take_tokens();
        let k = toks.len();
        let mut it = toks.into_iter();
        match k {
            // a stray terminator is tolerated
            0 => {}
            1 => {
                let t0 = it.next().expect("arity checked");
                let leaf = self.create_named(self.head, NodeKind::Leaf, t0);
                self.apply_stmt_flags(leaf);
            }
            2 => {
                let t0 = it.next().expect("arity checked");
                let t1 = it.next().expect("arity checked");
                let quoted = t1.quoted;
                let leaf = self.create_named(self.head, NodeKind::Leaf, t0);
                self.apply_stmt_flags(leaf);
                let n = self.dict.node_mut(leaf);
                n.value = Some(t1.into_owned());
                n.flags |= Self::value_flags(quoted);
            }
            3 | 4 => {
                let t0 = it.next().expect("arity checked");
                let t1 = it.next().expect("arity checked");
                let t2 = it.next().expect("arity checked");
                let instance = self.reuse_or_create(self.head, NodeKind::Instance, t0);
                self.apply_stmt_flags(instance);
                let branch = self.reuse_or_create(instance, NodeKind::Branch, t1);
                let leaf = self.create_named(branch, NodeKind::Leaf, t2);
                if let Some(t3) = it.next() {
                    let quoted = t3.quoted;
                    let n = self.dict.node_mut(leaf);
                    n.value = Some(t3.into_owned());
                    n.flags |= Self::value_flags(quoted);
                }
            }
            // five or more tokens: a branch holding name/value leaf pairs;
            // an odd tail leaf carries no value
            _ => {
                let t0 = it.next().expect("arity checked");
                let branch = self.create_named(self.head, NodeKind::Branch, t0);
                self.apply_stmt_flags(branch);
                while let Some(name) = it.next() {
                    let leaf = self.create_named(branch, NodeKind::Leaf, name);
                    if let Some(value) = it.next() {
                        let quoted = value.quoted;
                        let n = self.dict.node_mut(leaf);
                        n.value = Some(value.into_owned());
                        n.flags |= Self::value_flags(quoted);
                    }
                }
            }
        }
        self.reset_statement();
        Ok(())
    }

    fn on_block_begin(&mut self) -> Result<(), BsErrorKind> {
        if self.in_array() {
            // pending tokens become array leaves, then an anonymous
            // branch member opens
            self.flush_array_leaves();
            self.stack.push(self.head);
            let branch = self
                .dict
                .create_raw(self.head, NodeKind::Branch, None, None, 0);
            self.apply_stmt_flags(branch);
            self.head = branch;
            self.reset_statement();
            return Ok(());
        }

        let toks = self.take_tokens();
        let k = toks.len();
        let mut it = toks.into_iter();
        match k {
            // a bare '{' is only legal once, wrapping the whole document
            0 => {
                if self.head == self.dict.root() && self.stack.is_empty() {
                    self.stack.push(self.head);
                } else {
                    return Err(BsErrorKind::ExpId);
                }
            }
            1 => {
                let t0 = it.next().expect("arity checked");
                self.stack.push(self.head);
                let branch = self.create_named(self.head, NodeKind::Branch, t0);
                self.apply_stmt_flags(branch);
                self.head = branch;
            }
            2 => {
                let t0 = it.next().expect("arity checked");
                let t1 = it.next().expect("arity checked");
                self.stack.push(self.head);
                let instance = self.reuse_or_create(self.head, NodeKind::Instance, t0);
                self.apply_stmt_flags(instance);
                let branch = self.create_named(instance, NodeKind::Branch, t1);
                self.head = branch;
            }
            3 => {
                let t0 = it.next().expect("arity checked");
                let t1 = it.next().expect("arity checked");
                let t2 = it.next().expect("arity checked");
                self.stack.push(self.head);
                let outer = self.reuse_or_create(self.head, NodeKind::Instance, t0);
                self.apply_stmt_flags(outer);
                let inner = self.reuse_or_create(outer, NodeKind::Instance, t1);
                let branch = self.create_named(inner, NodeKind::Branch, t2);
                self.head = branch;
            }
            _ => return Err(BsErrorKind::UnexpId),
        }
        self.reset_statement();
        Ok(())
    }

    fn on_block_end(&mut self) -> Result<(), BsErrorKind> {
        if !self.cache.is_empty() {
            // tokens before '}' need no terminator: run the end-of-value
            // rules, then pop
            if self.in_array() {
                return Err(BsErrorKind::Block);
            }
            self.on_endval()?;
        }
        match self.stack.pop() {
            Some(prev) => {
                self.head = prev;
                Ok(())
            }
            None => Err(BsErrorKind::Level),
        }
    }

    fn on_array_begin(&mut self) -> Result<(), BsErrorKind> {
        if self.in_array() {
            // a nested array is an anonymous member of the outer one
            self.flush_array_leaves();
            self.stack.push(self.head);
            let array = self
                .dict
                .create_raw(self.head, NodeKind::Array, None, None, 0);
            self.apply_stmt_flags(array);
            self.head = array;
            self.reset_statement();
            return Ok(());
        }

        let toks = self.take_tokens();
        let k = toks.len();
        let mut it = toks.into_iter();
        match k {
            // arrays must be named unless nested in another array
            0 => return Err(BsErrorKind::ExpId),
            1 => {
                let t0 = it.next().expect("arity checked");
                self.stack.push(self.head);
                let array = self.create_named(self.head, NodeKind::Array, t0);
                self.apply_stmt_flags(array);
                self.head = array;
            }
            2 => {
                let t0 = it.next().expect("arity checked");
                let t1 = it.next().expect("arity checked");
                self.stack.push(self.head);
                let branch = self.create_named(self.head, NodeKind::Branch, t0);
                self.apply_stmt_flags(branch);
                let array = self.create_named(branch, NodeKind::Array, t1);
                self.head = array;
            }
            3 => {
                let t0 = it.next().expect("arity checked");
                let t1 = it.next().expect("arity checked");
                let t2 = it.next().expect("arity checked");
                self.stack.push(self.head);
                let instance = self.reuse_or_create(self.head, NodeKind::Instance, t0);
                self.apply_stmt_flags(instance);
                let branch = self.reuse_or_create(instance, NodeKind::Branch, t1);
                let array = self.create_named(branch, NodeKind::Array, t2);
                self.head = array;
            }
            _ => return Err(BsErrorKind::UnexpId),
        }
        self.reset_statement();
        Ok(())
    }

    fn on_array_end(&mut self) -> Result<(), BsErrorKind> {
        if !self.in_array() {
            return Err(BsErrorKind::Block);
        }
        // leftover tokens are whitespace-separated members
        self.flush_array_leaves();
        match self.stack.pop() {
            Some(prev) => {
                self.head = prev;
                self.reset_statement();
                Ok(())
            }
            None => Err(BsErrorKind::Block),
        }
    }

    fn on_eof(&mut self) -> Result<(), BsErrorKind> {
        if !self.cache.is_empty() {
            return Err(BsErrorKind::Eof);
        }
        if self.head != self.dict.root() || !self.stack.is_empty() {
            return Err(BsErrorKind::Level);
        }
        Ok(())
    }
}

impl BsDict {
    /// Parse the contents of a byte buffer into the dictionary.
    ///
    /// The buffer only needs to live for the duration of the call; every
    /// string ends up owned by the dictionary. On error the tree holds
    /// everything successfully inserted before the failure, with all
    /// invariants intact.
    pub fn parse(&mut self, buf: &[u8]) -> Result<(), barser_parse::BsError> {
        if self.is_readonly() {
            return Err(barser_parse::BsError::bare(BsErrorKind::Generic));
        }

        let mut scanner = Scanner::new(buf);
        let mut builder = Builder::new(self);
        loop {
            let step = match scanner.next_event() {
                ScanEvent::Token(tok) => builder.on_token(tok),
                ScanEvent::EndVal => builder.on_endval(),
                ScanEvent::BlockBegin => builder.on_block_begin(),
                ScanEvent::BlockEnd => builder.on_block_end(),
                ScanEvent::ArrayBegin => builder.on_array_begin(),
                ScanEvent::ArrayEnd => builder.on_array_end(),
                ScanEvent::Eof => {
                    return match builder.on_eof() {
                        Ok(()) => Ok(()),
                        Err(kind) => Err(scanner.describe(kind)),
                    };
                }
                ScanEvent::Error(kind) => Err(kind),
            };
            if let Err(kind) = step {
                return Err(scanner.describe(kind));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barser_parse::BsErrorKind;

    fn parse(input: &[u8]) -> BsDict {
        let mut dict = BsDict::new("test", 0);
        dict.parse(input).expect("parse should succeed");
        dict
    }

    fn parse_err(input: &[u8]) -> barser_parse::BsError {
        let mut dict = BsDict::new("test", 0);
        dict.parse(input).expect_err("parse should fail")
    }

    fn child_names(dict: &BsDict, id: NodeId) -> Vec<String> {
        dict.children(id)
            .map(|c| dict.node(c).name_str().into_owned())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let dict = parse(b"");
        assert_eq!(dict.node(dict.root()).child_count(), 0);
    }

    #[test]
    fn test_outer_wrapper() {
        let dict = parse(b"{}");
        assert_eq!(dict.node(dict.root()).child_count(), 0);

        let dict = parse(b"{ a { b { c 1; } } }");
        let c = dict.get("a/b/c").unwrap();
        assert_eq!(dict.node(c).value(), Some(&b"1"[..]));
    }

    #[test]
    fn test_arity_1_leaf() {
        let dict = parse(b"standalone;");
        let n = dict.get("standalone").unwrap();
        assert_eq!(dict.node(n).kind(), NodeKind::Leaf);
        assert_eq!(dict.node(n).value(), None);
    }

    #[test]
    fn test_arity_2_leaf_with_value() {
        // two tokens outside an array: a leaf named t0 with value t1
        let dict = parse(b"a b;");
        assert_eq!(dict.node(dict.root()).child_count(), 1);
        let n = dict.get("a").unwrap();
        assert_eq!(dict.node(n).kind(), NodeKind::Leaf);
        assert_eq!(dict.node(n).value(), Some(&b"b"[..]));
    }

    #[test]
    fn test_arity_3_and_4_instance() {
        let dict = parse(b"car bob doors;");
        let inst = dict.get("car").unwrap();
        assert_eq!(dict.node(inst).kind(), NodeKind::Instance);
        let bob = dict.get("car/bob").unwrap();
        assert_eq!(dict.node(bob).kind(), NodeKind::Branch);
        let doors = dict.get("car/bob/doors").unwrap();
        assert_eq!(dict.node(doors).kind(), NodeKind::Leaf);
        assert_eq!(dict.node(doors).value(), None);

        let dict = parse(b"car bob doors 3;");
        let doors = dict.get("car/bob/doors").unwrap();
        assert_eq!(dict.node(doors).value(), Some(&b"3"[..]));
    }

    #[test]
    fn test_arity_3_reuses_instance_and_branch() {
        let dict = parse(b"car bob doors 3; car bob wheels 4;");
        assert_eq!(dict.node(dict.root()).child_count(), 1);
        let bob = dict.get("car/bob").unwrap();
        assert_eq!(child_names(&dict, bob), ["doors", "wheels"]);
    }

    #[test]
    fn test_arity_5_plus_pairs() {
        let dict = parse(b"iface mtu 9000 speed 10g duplex;");
        let iface = dict.get("iface").unwrap();
        assert_eq!(dict.node(iface).kind(), NodeKind::Branch);
        assert_eq!(child_names(&dict, iface), ["mtu", "speed", "duplex"]);
        assert_eq!(
            dict.node(dict.get("iface/mtu").unwrap()).value(),
            Some(&b"9000"[..])
        );
        assert_eq!(
            dict.node(dict.get("iface/speed").unwrap()).value(),
            Some(&b"10g"[..])
        );
        // odd tail leaf has no value
        assert_eq!(dict.node(dict.get("iface/duplex").unwrap()).value(), None);
    }

    #[test]
    fn test_stray_terminators() {
        let dict = parse(b";;; a 1; ;");
        assert_eq!(dict.node(dict.root()).child_count(), 1);
    }

    #[test]
    fn test_block_descent() {
        let dict = parse(b"cars { car bob { doors 3; } }");
        let cars = dict.get("cars").unwrap();
        assert_eq!(dict.node(cars).kind(), NodeKind::Branch);
        let car = dict.get("cars/car").unwrap();
        assert_eq!(dict.node(car).kind(), NodeKind::Instance);
        let bob = dict.get("cars/car/bob").unwrap();
        assert_eq!(dict.node(bob).kind(), NodeKind::Branch);
        let doors = dict.get("cars/car/bob/doors").unwrap();
        assert_eq!(dict.node(doors).value(), Some(&b"3"[..]));
    }

    #[test]
    fn test_block_2_reuses_instance() {
        let dict = parse(b"car bob { doors 3; } car alice { doors 5; }");
        assert_eq!(dict.node(dict.root()).child_count(), 1);
        let car = dict.get("car").unwrap();
        assert_eq!(child_names(&dict, car), ["bob", "alice"]);
    }

    #[test]
    fn test_block_3_nested_instances() {
        let dict = parse(b"a b c { x 1; }");
        let a = dict.get("a").unwrap();
        let b = dict.get("a/b").unwrap();
        let c = dict.get("a/b/c").unwrap();
        assert_eq!(dict.node(a).kind(), NodeKind::Instance);
        assert_eq!(dict.node(b).kind(), NodeKind::Instance);
        assert_eq!(dict.node(c).kind(), NodeKind::Branch);
        assert_eq!(dict.node(dict.get("a/b/c/x").unwrap()).value(), Some(&b"1"[..]));
    }

    #[test]
    fn test_tokens_before_block_end_need_no_terminator() {
        let dict = parse(b"box { side 5 }");
        assert_eq!(
            dict.node(dict.get("box/side").unwrap()).value(),
            Some(&b"5"[..])
        );
    }

    #[test]
    fn test_array_members_are_numbered_leaves() {
        let dict = parse(b"arr [ 1 2 3 ];");
        let arr = dict.get("arr").unwrap();
        assert_eq!(dict.node(arr).kind(), NodeKind::Array);
        assert_eq!(child_names(&dict, arr), ["0", "1", "2"]);
        for (i, want) in [b"1", b"2", b"3"].iter().enumerate() {
            let m = dict.nth_child(arr, i).unwrap();
            assert_eq!(dict.node(m).kind(), NodeKind::Leaf);
            assert_eq!(dict.node(m).value(), Some(&want[..]));
        }
    }

    #[test]
    fn test_array_member_separators_are_optional() {
        for input in [
            b"arr [ 1 2 3 ];" as &[u8],
            b"arr [ 1, 2, 3 ];",
            b"arr [ 1; 2; 3; ];",
        ] {
            let dict = parse(input);
            let arr = dict.get("arr").unwrap();
            assert_eq!(child_names(&dict, arr), ["0", "1", "2"], "{:?}", input);
        }
    }

    #[test]
    fn test_nested_arrays_and_blocks() {
        let dict = parse(b"matrix [ [ 1 2 ] [ 3 4 ] ];");
        let m = dict.get("matrix").unwrap();
        assert_eq!(dict.node(m).child_count(), 2);
        let row0 = dict.nth_child(m, 0).unwrap();
        assert_eq!(dict.node(row0).kind(), NodeKind::Array);
        assert_eq!(
            dict.node(dict.get("matrix/0/1").unwrap()).value(),
            Some(&b"2"[..])
        );

        let dict = parse(b"list [ { x 1; } { x 2; } ];");
        let list = dict.get("list").unwrap();
        let first = dict.nth_child(list, 0).unwrap();
        assert_eq!(dict.node(first).kind(), NodeKind::Branch);
        assert_eq!(
            dict.node(dict.get("list/0/x").unwrap()).value(),
            Some(&b"1"[..])
        );
    }

    #[test]
    fn test_array_quoted_members_keep_flag() {
        let dict = parse(b"arr [ plain \"quoted\" ];");
        let arr = dict.get("arr").unwrap();
        let a = dict.nth_child(arr, 0).unwrap();
        let b = dict.nth_child(arr, 1).unwrap();
        assert!(!dict.node(a).has_flag(flags::QUOTED_VALUE));
        assert!(dict.node(b).has_flag(flags::QUOTED_VALUE));
        assert_eq!(dict.node(b).value(), Some(&b"quoted"[..]));
    }

    #[test]
    fn test_quoted_name_and_value_flags() {
        let dict = parse(b"\"my name\" \"my value\";");
        let n = dict.get_child(dict.root(), b"my name").unwrap();
        assert!(dict.node(n).has_flag(flags::QUOTED_NAME));
        assert!(dict.node(n).has_flag(flags::QUOTED_VALUE));
        assert_eq!(dict.node(n).value(), Some(&b"my value"[..]));
    }

    #[test]
    fn test_inactive_modifier() {
        let dict = parse(b"inactive: box { side 5; }");
        let b = dict.get("box").unwrap();
        assert!(dict.node(b).has_flag(flags::INACTIVE));
        assert!(!dict.node(b).has_flag(flags::INACTIVE_CHILD));
        let side = dict.get("box/side").unwrap();
        assert!(dict.node(side).has_flag(flags::INACTIVE_CHILD));
        assert!(!dict.node(side).has_flag(flags::INACTIVE));
    }

    #[test]
    fn test_inactive_modifier_on_leaf() {
        let dict = parse(b"inactive: speed 10;");
        let n = dict.get("speed").unwrap();
        assert!(dict.node(n).has_flag(flags::INACTIVE));
        assert_eq!(dict.node(n).value(), Some(&b"10"[..]));
    }

    #[test]
    fn test_quoted_modifier_is_a_name() {
        // a quoted "inactive:" is an ordinary token, not a modifier
        let dict = parse(b"\"inactive:\" x;");
        let n = dict.get_child(dict.root(), b"inactive:").unwrap();
        assert!(!dict.node(n).has_flag(flags::INACTIVE));
        assert_eq!(dict.node(n).value(), Some(&b"x"[..]));
    }

    #[test]
    fn test_token_overflow_errors_outside_array() {
        // 21 consecutive identifiers: one more than the cache holds
        let mut input = Vec::new();
        for i in 0..21 {
            input.extend_from_slice(format!("t{} ", i).as_bytes());
        }
        input.extend_from_slice(b";");
        let err = parse_err(&input);
        assert_eq!(err.kind, BsErrorKind::Tokens);

        // twenty exactly is fine
        let mut input = Vec::new();
        for i in 0..20 {
            input.extend_from_slice(format!("t{} ", i).as_bytes());
        }
        input.extend_from_slice(b";");
        let dict = parse(&input);
        let t0 = dict.get("t0").unwrap();
        assert_eq!(dict.node(t0).kind(), NodeKind::Branch);
    }

    #[test]
    fn test_token_overflow_batches_inside_array() {
        let mut input = Vec::new();
        input.extend_from_slice(b"arr [ ");
        for i in 0..50 {
            input.extend_from_slice(format!("v{} ", i).as_bytes());
        }
        input.extend_from_slice(b"];");
        let dict = parse(&input);
        let arr = dict.get("arr").unwrap();
        assert_eq!(dict.node(arr).child_count(), 50);
        assert_eq!(
            dict.node(dict.get("arr/49").unwrap()).value(),
            Some(&b"v49"[..])
        );
    }

    #[test]
    fn test_bare_close_is_level_error() {
        let err = parse_err(b"}");
        assert_eq!(err.kind, BsErrorKind::Level);
        assert_eq!(err.at.line, 1);
        assert_eq!(err.at.col, 1);
    }

    #[test]
    fn test_unbalanced_open_is_level_error() {
        let err = parse_err(b"a { b 1;");
        assert_eq!(err.kind, BsErrorKind::Level);
    }

    #[test]
    fn test_wrapper_left_open_is_level_error() {
        let err = parse_err(b"{ a 1;");
        assert_eq!(err.kind, BsErrorKind::Level);
    }

    #[test]
    fn test_unnamed_block_inside_block_is_exp_id_error() {
        let err = parse_err(b"a { { b 2; } }");
        assert_eq!(err.kind, BsErrorKind::ExpId);
    }

    #[test]
    fn test_unnamed_block_at_root_is_tolerated() {
        // anywhere the head is the root with an empty stack, a bare
        // wrapper may open
        let dict = parse(b"a 1; { b 2; }");
        assert_eq!(dict.node(dict.get("b").unwrap()).value(), Some(&b"2"[..]));
    }

    #[test]
    fn test_unnamed_array_is_exp_id_error() {
        let err = parse_err(b"[ 1 2 ];");
        assert_eq!(err.kind, BsErrorKind::ExpId);
    }

    #[test]
    fn test_array_close_outside_array_is_block_error() {
        let err = parse_err(b"a { ] }");
        assert_eq!(err.kind, BsErrorKind::Block);
    }

    #[test]
    fn test_block_end_inside_array_is_block_error() {
        let err = parse_err(b"arr [ 1 2 }");
        assert_eq!(err.kind, BsErrorKind::Block);
    }

    #[test]
    fn test_pending_tokens_at_eof() {
        let err = parse_err(b"a b");
        assert_eq!(err.kind, BsErrorKind::Eof);
    }

    #[test]
    fn test_too_many_begin_tokens() {
        let err = parse_err(b"a b c d { }");
        assert_eq!(err.kind, BsErrorKind::UnexpId);
        let err = parse_err(b"a b c d [ ]");
        assert_eq!(err.kind, BsErrorKind::UnexpId);
    }

    #[test]
    fn test_readonly_dict_refuses_parse() {
        let mut dict = BsDict::new("ro", BsDict::READONLY);
        let err = dict.parse(b"a 1;").expect_err("must refuse");
        assert_eq!(err.kind, BsErrorKind::Generic);
    }

    #[test]
    fn test_comments_and_formats_mix() {
        let dict = parse(
            b"# hash comment\n\
              json_style: \"yes\", // line comment\n\
              juniper { /* block\n comment */ unit 0:1:2; }\n",
        );
        // 'json_style:' keeps its colon, ':' being an extended token byte
        let n = dict.get_child(dict.root(), b"json_style:").unwrap();
        assert_eq!(dict.node(n).value(), Some(&b"yes"[..]));
        let u = dict.get("juniper/unit").unwrap();
        assert_eq!(dict.node(u).value(), Some(&b"0:1:2"[..]));
    }

    #[test]
    fn test_parse_error_keeps_partial_tree_valid() {
        let mut dict = BsDict::new("test", 0);
        let err = dict.parse(b"a 1; b { c 2; } $");
        assert!(err.is_err());
        // everything inserted before the error is present and queryable
        assert_eq!(
            dict.node(dict.get("a").unwrap()).value(),
            Some(&b"1"[..])
        );
        assert_eq!(
            dict.node(dict.get("b/c").unwrap()).value(),
            Some(&b"2"[..])
        );
    }

    #[test]
    fn test_array_two_tokens_take_last_as_value() {
        let dict = parse(b"arr [ name 42; ];");
        let arr = dict.get("arr").unwrap();
        assert_eq!(dict.node(arr).child_count(), 1);
        let m = dict.nth_child(arr, 0).unwrap();
        assert_eq!(dict.node(m).value(), Some(&b"42"[..]));
    }
}
