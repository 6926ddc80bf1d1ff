//! Canned replies.

use rand::prelude::IndexedRandom;

pub const I_DONT_UNDERSTAND: &[&str] = &[
    "奶茶现在还不太明白你在说什么呢，但没关系，以后的奶茶会变得更强呢！",
    "唔……奶茶没听懂，可以换个说法吗？",
    "这个问题有点难，奶茶还要再学习一下~",
    "奶茶好像没理解你的意思呢，能再说一遍吗？",
];

pub const READY_TO_CHAT: &[&str] = &[
    "奶茶已经准备好啦，来跟奶茶聊天吧~\n\n（发送“拜拜”可以结束聊天哦）",
    "来啦来啦，想聊点什么呢？\n\n（发送“再见”可以结束聊天哦）",
];

pub const FAREWELL: &[&str] = &["拜拜~", "再见啦，下次再来找奶茶玩哦~", "好的，奶茶先走啦~"];

pub const CANCELLED: &[&str] = &[
    "好的",
    "好的吧",
    "好吧，那奶茶就不打扰啦",
    "那奶茶先不打扰小主人啦",
];

/// Picks one expression at random.
#[must_use]
pub fn render(expressions: &[&'static str]) -> &'static str {
    expressions
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_of_the_expressions() {
        for _ in 0..20 {
            assert!(I_DONT_UNDERSTAND.contains(&render(I_DONT_UNDERSTAND)));
        }
    }

    #[test]
    fn empty_list_renders_nothing() {
        assert_eq!(render(&[]), "");
    }
}
