//! # Relevance Ranking
//!
//! Search results are bucketed by *where* the query matched, not scored. An
//! exact title hit beats a partial title hit, which beats any hit in a
//! secondary field. Within a bucket each entity kind has its own tie-break:
//! posts go newest first, boards and clubs alphabetically.
//!
//! Candidates that match nowhere are dropped, so the storage layer may hand
//! over a loose superset.

use std::cmp::Ordering;

use crate::models::{Board, Club, Post};

/// Relevance bucket. Derived `Ord` gives the rank: `Exact < Primary < Secondary(0) < Secondary(1) ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Primary field equals the query, ignoring case.
    Exact,
    /// Primary field contains the query.
    Primary,
    /// The n-th declared secondary field contains the query.
    Secondary(u8),
}

impl Tier {
    /// 1-based bucket number, as shown in debug output.
    pub fn number(self) -> u8 {
        match self {
            Tier::Exact => 1,
            Tier::Primary => 2,
            Tier::Secondary(n) => n.saturating_add(3),
        }
    }
}

pub type Field<T> = for<'a> fn(&'a T) -> &'a str;

/// Which fields of `T` are searched, in priority order, and how ties inside a
/// tier are broken.
pub struct FieldSelectors<T> {
    pub primary: Field<T>,
    pub secondary: Vec<Field<T>>,
    pub tie_break: fn(&T, &T) -> Ordering,
}

impl<T> Clone for FieldSelectors<T> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary,
            secondary: self.secondary.clone(),
            tie_break: self.tie_break,
        }
    }
}

impl FieldSelectors<Post> {
    /// title, then content. Newest first inside a tier.
    pub fn posts() -> Self {
        Self {
            primary: post_title,
            secondary: vec![post_content as Field<Post>],
            tie_break: newest_post_first,
        }
    }
}

impl FieldSelectors<Board> {
    /// title, then slug, then description. Slug hits stay ahead of
    /// description-only hits.
    pub fn boards() -> Self {
        Self {
            primary: board_title,
            secondary: vec![board_slug as Field<Board>, board_description],
            tie_break: board_title_order,
        }
    }
}

impl FieldSelectors<Club> {
    /// name, then topic, then description.
    pub fn clubs() -> Self {
        Self {
            primary: club_name,
            secondary: vec![club_topic as Field<Club>, club_description],
            tie_break: club_name_order,
        }
    }
}

fn post_title(p: &Post) -> &str {
    &p.title
}

fn post_content(p: &Post) -> &str {
    &p.content
}

fn board_title(b: &Board) -> &str {
    &b.title
}

fn board_slug(b: &Board) -> &str {
    &b.slug
}

fn board_description(b: &Board) -> &str {
    &b.description
}

fn club_name(c: &Club) -> &str {
    &c.name
}

fn club_topic(c: &Club) -> &str {
    &c.topic
}

fn club_description(c: &Club) -> &str {
    &c.description
}

fn newest_post_first(a: &Post, b: &Post) -> Ordering {
    b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))
}

fn board_title_order(a: &Board, b: &Board) -> Ordering {
    alphabetical(&a.title, &b.title).then(a.id.cmp(&b.id))
}

fn club_name_order(a: &Club, b: &Club) -> Ordering {
    alphabetical(&a.name, &b.name).then(a.id.cmp(&b.id))
}

/// Case-insensitive first, so "apple" and "Banana" sort the way a reader expects.
fn alphabetical(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Lowercased, trimmed query. `None` when nothing is left to match.
fn normalize(query: &str) -> Option<String> {
    let trimmed = query.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn tier_normalized<T>(needle: &str, candidate: &T, selectors: &FieldSelectors<T>) -> Option<Tier> {
    let primary = (selectors.primary)(candidate).to_lowercase();
    if primary == needle {
        return Some(Tier::Exact);
    }
    if primary.contains(needle) {
        return Some(Tier::Primary);
    }

    selectors
        .secondary
        .iter()
        .position(|field| field(candidate).to_lowercase().contains(needle))
        .map(|n| Tier::Secondary(u8::try_from(n).unwrap_or(u8::MAX)))
}

/// Tier of one candidate, or `None` if the query matches none of its fields.
/// The query is trimmed first; a blank query matches nothing.
pub fn tier<T>(query: &str, candidate: &T, selectors: &FieldSelectors<T>) -> Option<Tier> {
    let needle = normalize(query)?;
    tier_normalized(&needle, candidate, selectors)
}

/// Filters `candidates` down to real matches and orders them by tier, then by
/// the entity's tie-break.
pub fn rank<T>(query: &str, candidates: Vec<T>, selectors: &FieldSelectors<T>) -> Vec<T> {
    let Some(needle) = normalize(query) else {
        return Vec::new();
    };

    let mut ranked: Vec<(Tier, T)> = candidates
        .into_iter()
        .filter_map(|c| tier_normalized(&needle, &c, selectors).map(|t| (t, c)))
        .collect();

    ranked.sort_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| (selectors.tie_break)(a, b)));
    ranked.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn post(id: i64, title: &str, content: &str, day: i64) -> Post {
        Post {
            id,
            board_id: 1,
            title: title.into(),
            content: content.into(),
            author_id: 1,
            image_url: None,
            link_url: None,
            created_at: at(day),
            updated_at: at(day),
        }
    }

    fn board(id: i64, title: &str, slug: &str, description: &str) -> Board {
        Board {
            id,
            slug: slug.into(),
            title: title.into(),
            description: description.into(),
            club_id: None,
        }
    }

    fn club(id: i64, name: &str, topic: &str, description: &str) -> Club {
        Club {
            id,
            name: name.into(),
            topic: topic.into(),
            description: description.into(),
            image_data: None,
        }
    }

    fn post_titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[test]
    fn test_exact_title_beats_partial_title() {
        let ranked = rank(
            "Go Basics",
            vec![post(1, "Learning Go Basics fast", "", 9), post(2, "Go Basics", "", 0)],
            &FieldSelectors::posts(),
        );
        assert_eq!(post_titles(&ranked), vec!["Go Basics", "Learning Go Basics fast"]);
    }

    #[test]
    fn test_tiers_for_posts() {
        let s = FieldSelectors::posts();
        assert_eq!(tier("go basics", &post(1, "Go Basics", "", 0), &s), Some(Tier::Exact));
        assert_eq!(tier("Go", &post(1, "Learning Go", "", 0), &s), Some(Tier::Primary));
        assert_eq!(tier("go", &post(1, "Rust", "written in GO", 0), &s), Some(Tier::Secondary(0)));
        assert_eq!(tier("go", &post(1, "Rust", "Python", 0), &s), None);
    }

    #[test]
    fn test_query_is_trimmed_on_every_path() {
        let s = FieldSelectors::posts();
        assert_eq!(tier("  Go Basics \t", &post(1, "Go Basics", "", 0), &s), Some(Tier::Exact));
        let ranked = rank("  rust ", vec![post(1, "Rust", "", 0)], &s);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_blank_query_ranks_nothing() {
        let ranked = rank("   ", vec![post(1, "anything", "", 0)], &FieldSelectors::posts());
        assert!(ranked.is_empty());
        assert_eq!(tier("", &post(1, "anything", "", 0), &FieldSelectors::posts()), None);
    }

    #[test]
    fn test_non_matching_candidates_are_excluded() {
        let ranked = rank(
            "axum",
            vec![post(1, "actix", "web", 0), post(2, "axum tips", "", 0)],
            &FieldSelectors::posts(),
        );
        assert_eq!(post_titles(&ranked), vec!["axum tips"]);
    }

    #[test]
    fn test_posts_newest_first_within_tier() {
        let ranked = rank(
            "tokio",
            vec![
                post(1, "tokio intro", "", 1),
                post(2, "about runtimes", "tokio", 5),
                post(3, "tokio deep dive", "", 3),
                post(4, "tokio again", "", 3),
            ],
            &FieldSelectors::posts(),
        );
        let ids: Vec<i64> = ranked.iter().map(|p| p.id).collect();
        // same day: id ascending
        assert_eq!(ids, vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_board_slug_ranks_between_title_and_description() {
        let ranked = rank(
            "rs",
            vec![
                board(1, "Zed", "zed", "rs editors"),
                board(2, "Systems", "rs-systems", "low level"),
                board(3, "Rust (rs)", "rust", ""),
                board(4, "RS", "rs", ""),
            ],
            &FieldSelectors::boards(),
        );
        let ids: Vec<i64> = ranked.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_boards_alphabetical_within_tier() {
        let ranked = rank(
            "dev",
            vec![
                board(1, "web dev", "web", ""),
                board(2, "Backend dev", "be", ""),
                board(3, "apple dev", "ios", ""),
            ],
            &FieldSelectors::boards(),
        );
        let titles: Vec<&str> = ranked.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["apple dev", "Backend dev", "web dev"]);
    }

    #[test]
    fn test_clubs_topic_before_description() {
        let ranked = rank(
            "chess",
            vec![
                club(1, "Knights", "games", "we play chess"),
                club(2, "Pawns", "chess", ""),
                club(3, "Chess Club", "", ""),
                club(4, "Speed chess", "", ""),
            ],
            &FieldSelectors::clubs(),
        );
        let ids: Vec<i64> = ranked.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn test_case_insensitive_non_ascii() {
        let s = FieldSelectors::clubs();
        assert_eq!(tier("шахматы", &club(1, "Шахматы", "", ""), &s), Some(Tier::Exact));
    }

    #[test]
    fn test_tier_numbers() {
        assert_eq!(Tier::Exact.number(), 1);
        assert_eq!(Tier::Primary.number(), 2);
        assert_eq!(Tier::Secondary(1).number(), 4);
        assert!(Tier::Primary < Tier::Secondary(0));
    }
}
