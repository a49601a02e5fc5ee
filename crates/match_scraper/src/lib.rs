//! Match relay scraper: lineup + live relay pages → roster and chronological timeline
//!
//! Page layout (mobile sports site, CSS-module class names with hashed suffixes):
//! https://m.sports.naver.com/game/<match_id>/lineup
//!   <section class="Home_game_panel__x">
//!     <div class="LineUp_home_team__x"> <span class="LineUp_name__x">...</span> </div>
//!     <div class="LineUp_away_team__x"> ... </div>
//!     <table><tbody><tr><td><span>home sub</span></td><td><span>away sub</span></td></tr></tbody></table>
//! https://m.sports.naver.com/game/<match_id>/relay
//!   <section class="Home_game_head__x"> <em>home</em> <img src> <em>away</em> <img src> </section>
//!   <div class="relay_list_area"> <li> <div>clock + status</div> <div><p>desc</p></div> </li> </div>
//!
//! The relay feed lists entries latest-first.

use anyhow::{anyhow, bail, Context, Result};
use headless_chrome::{Browser, LaunchOptions};
use logger::{now_iso, EventLogger, TimelineScrapedEvent};
use match_model::{chronological, ArtifactStore, Category, MatchRecord, Roster, Side, TeamInfo, TimelineEvent};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tokio::task;
use tracing::{debug, info, warn};

/// Present once the lineup page has rendered player names.
const LINEUP_READY: &str = "section[class*='Home_game_panel'] span[class*='LineUp_name']";
/// Present once the relay page has rendered at least one entry.
const RELAY_READY: &str = ".relay_list_area li";
const COLLAPSED_SECTION: &str = "a[class*='TimeLine_button'][aria-pressed='false']";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url:     String,
    /// Bounded wait for the lineup names and relay entries; exceeding it fails the run.
    pub page_timeout: Duration,
    /// Pause before reading each page and after each expand click.
    pub click_settle: Duration,
    pub headless:     bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url:     "https://m.sports.naver.com/game".to_string(),
            page_timeout: Duration::from_secs(10),
            click_settle: Duration::from_secs(1),
            headless:     true,
        }
    }
}

/// Rendered HTML of the two pages of one match.
#[derive(Debug, Clone)]
pub struct RenderedPages {
    pub lineup: String,
    pub relay:  String,
}

#[derive(Debug, Clone)]
pub struct ScrapedMatch {
    pub roster: Roster,
    pub record: MatchRecord,
}

impl ScrapedMatch {
    /// Roster, full record and highlight record, in that order.
    pub fn persist(&self, store: &ArtifactStore) -> Result<()> {
        store.save_roster(&self.roster)?;
        store.save_match(&self.record)
    }
}

pub struct MatchScraper {
    config: ScraperConfig,
    logger: EventLogger,
}

impl MatchScraper {
    pub fn new(config: ScraperConfig, log_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            config,
            logger: EventLogger::new(log_dir),
        }
    }

    pub fn lineup_url(&self, match_id: &str) -> String {
        format!("{}/{}/lineup", self.config.base_url.trim_end_matches('/'), match_id)
    }

    pub fn relay_url(&self, match_id: &str) -> String {
        format!("{}/{}/relay", self.config.base_url.trim_end_matches('/'), match_id)
    }

    /// Renders both pages, parses them and records an audit line for `channel`.
    pub async fn scrape(&self, match_id: &str, channel: &str) -> Result<ScrapedMatch> {
        let pages = self.render_pages(match_id).await?;
        let scraped = parse_pages(&pages)?;

        info!(
            players = scraped.roster.len(),
            events = scraped.record.timeline.len(),
            "{} vs {} — relay scraped",
            scraped.record.home_team.name, scraped.record.away_team.name
        );

        let _ = self.logger.log(&TimelineScrapedEvent {
            ts:         now_iso(),
            event:      "TIMELINE_SCRAPED",
            match_id:   match_id.to_string(),
            channel:    channel.to_string(),
            home:       scraped.record.home_team.name.clone(),
            away:       scraped.record.away_team.name.clone(),
            players:    scraped.roster.len(),
            events:     scraped.record.timeline.len(),
            highlights: scraped.record.highlights().timeline.len(),
        });

        Ok(scraped)
    }

    /// One browser session for both pages. The browser is owned by the blocking
    /// closure, so Chrome is shut down on every exit path, errors included.
    async fn render_pages(&self, match_id: &str) -> Result<RenderedPages> {
        let lineup_url = self.lineup_url(match_id);
        let relay_url = self.relay_url(match_id);
        let config = self.config.clone();

        task::spawn_blocking(move || -> Result<RenderedPages> {
            let options = LaunchOptions::default_builder()
                .headless(config.headless)
                .sandbox(false)
                .build()
                .context("Failed to build Chrome launch options")?;

            let browser = Browser::new(options).context("Failed to launch Chrome")?;
            let tab = browser.new_tab().context("Failed to create browser tab")?;

            info!("Loading lineup page {}", lineup_url);
            tab.navigate_to(&lineup_url).context("Chrome navigate (lineup) failed")?;
            tab.wait_for_element_with_custom_timeout(LINEUP_READY, config.page_timeout)
                .context("lineup page: player names did not render")?;
            std::thread::sleep(config.click_settle);
            let lineup = tab.get_content().context("Failed to read lineup HTML")?;

            info!("Loading relay page {}", relay_url);
            tab.navigate_to(&relay_url).context("Chrome navigate (relay) failed")?;
            tab.wait_for_element_with_custom_timeout(RELAY_READY, config.page_timeout)
                .context("relay page: relay entries did not render")?;

            // collapsed timeline sections hide older relay entries; find_elements
            // errors when none match, and parse_relay_feed rejects any left collapsed
            match tab.find_elements(COLLAPSED_SECTION) {
                Ok(buttons) => {
                    for button in &buttons {
                        button.click().context("Failed to expand timeline section")?;
                        std::thread::sleep(config.click_settle);
                    }
                    debug!("Expanded {} timeline sections", buttons.len());
                }
                Err(e) => debug!("No collapsed timeline sections: {}", e),
            }

            std::thread::sleep(config.click_settle);
            let relay = tab.get_content().context("Failed to read relay HTML")?;
            Ok(RenderedPages { lineup, relay })
        })
        .await?
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector '{}': {:?}", css, e))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn content_root<'a>(doc: &'a Html, page: &str) -> Result<ElementRef<'a>> {
    doc.select(&selector("#content")?)
        .next()
        .with_context(|| format!("{page} page: #content not found"))
}

pub fn parse_pages(pages: &RenderedPages) -> Result<ScrapedMatch> {
    let roster = parse_roster(&pages.lineup)?;
    let (home_team, away_team) = parse_teams(&pages.relay)?;
    let timeline = chronological(parse_relay_feed(&pages.relay)?);

    Ok(ScrapedMatch {
        roster,
        record: MatchRecord {
            home_team,
            away_team,
            timeline,
        },
    })
}

/// Starting lineups plus the substitutes table (left column home, right column away).
pub fn parse_roster(html: &str) -> Result<Roster> {
    let doc = Html::parse_document(html);
    let content = content_root(&doc, "lineup")?;

    let panel = content
        .select(&selector("section[class*='Home_game_panel']")?)
        .last()
        .context("lineup page: game panel section not found")?;

    let name_sel = selector("span[class*='LineUp_name']")?;
    let mut roster = Roster::new();

    for (block_css, side) in [
        ("div[class*='LineUp_home_team']", Side::Home),
        ("div[class*='LineUp_away_team']", Side::Away),
    ] {
        let block = panel
            .select(&selector(block_css)?)
            .next()
            .with_context(|| format!("lineup page: {} lineup block not found", side.as_str()))?;

        for span in block.select(&name_sel) {
            roster.insert(&text_of(span), side);
        }
    }

    let table = panel
        .select(&selector("table")?)
        .next()
        .context("lineup page: substitutes table not found")?;
    let row_sel = selector("tbody tr")?;
    let cell_sel = selector("td")?;
    let span_sel = selector("span")?;

    for row in table.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 2 {
            bail!("lineup page: substitutes row has {} cells, expected 2", cells.len());
        }
        for (cell, side) in [(cells[0], Side::Home), (cells[1], Side::Away)] {
            if let Some(span) = cell.select(&span_sel).next() {
                roster.insert(&text_of(span), side);
            }
        }
    }

    for side in [Side::Home, Side::Away] {
        if roster.players_on(side).is_empty() {
            bail!("lineup page: no {} players found", side.as_str());
        }
    }

    Ok(roster)
}

/// Team names and logos from the match head section of the relay page.
pub fn parse_teams(html: &str) -> Result<(TeamInfo, TeamInfo)> {
    let doc = Html::parse_document(html);
    let content = content_root(&doc, "relay")?;

    let head = content
        .select(&selector("section[class*='Home_game_head']")?)
        .last()
        .context("relay page: match head section not found")?;

    let names: Vec<_> = head.select(&selector("em")?).map(text_of).collect();
    let logos: Vec<_> = head
        .select(&selector("img")?)
        .map(|img| img.value().attr("src").unwrap_or_default().to_string())
        .collect();

    if names.len() < 2 || logos.len() < 2 {
        bail!(
            "relay page: match head has {} names / {} logos, expected 2 each",
            names.len(),
            logos.len()
        );
    }

    // the home label carries a one-character marker ahead of the name
    let home_name: String = names[0].chars().skip(1).collect();

    Ok((
        TeamInfo { name: home_name.trim().to_string(), logo: logos[0].clone() },
        TeamInfo { name: names[1].clone(), logo: logos[1].clone() },
    ))
}

/// Relay entries in feed order (latest first). Pass through `chronological` before storing.
pub fn parse_relay_feed(html: &str) -> Result<Vec<TimelineEvent>> {
    let doc = Html::parse_document(html);
    let content = content_root(&doc, "relay")?;

    let area_sel = selector(".relay_list_area")?;
    let li_sel = selector("li")?;
    let div_sel = selector("div")?;
    let span_sel = selector("span")?;
    let p_sel = selector("p")?;
    let blind_sel = selector(".blind")?;
    let strong_sel = selector("strong")?;

    let areas: Vec<_> = content.select(&area_sel).collect();
    if areas.is_empty() {
        bail!("relay page: .relay_list_area not found");
    }
    if content.select(&selector(COLLAPSED_SECTION)?).next().is_some() {
        bail!("relay page: timeline sections are still collapsed");
    }

    let mut feed = Vec::new();

    for area in areas {
        for li in area.select(&li_sel) {
            let divs: Vec<_> = li.select(&div_sel).collect();
            if divs.len() < 2 {
                bail!("relay entry #{}: expected info and text blocks", feed.len());
            }
            let (info_area, text_area) = (divs[0], divs[1]);

            let spans: Vec<_> = info_area.select(&span_sel).collect();
            let clock = spans
                .first()
                .map(|s| text_of(*s))
                .with_context(|| format!("relay entry #{}: clock label missing", feed.len()))?;

            let desc = text_area
                .select(&p_sel)
                .next()
                .map(text_of)
                .with_context(|| format!("relay entry #{}: description missing", feed.len()))?;

            // a second span is the status badge; its label sits in a visually hidden node
            let status = (spans.len() > 1).then(|| {
                info_area
                    .select(&blind_sel)
                    .next()
                    .map(text_of)
                    .unwrap_or_default()
            });

            let category = Category::from_feed(status.as_deref(), &clock);
            let mut event = TimelineEvent::from_feed(&clock, &desc, category);

            if category.names_player() {
                event.name = text_area.select(&strong_sel).next().map(text_of);
                if event.name.is_none() {
                    warn!("Relay entry [{}] {:?} has no emphasized player name", clock, category);
                }
            }

            feed.push(event);
        }
    }

    if feed.is_empty() {
        bail!("relay page: relay list has no entries");
    }

    debug!("Parsed {} relay entries", feed.len());
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINEUP_HTML: &str = r#"
        <html><body><div id="content">
          <section class="Home_game_head__a1"></section>
          <section class="Home_game_panel__b2">
            <div class="LineUp_home_team__c3">
              <span class="LineUp_name__d4">데클런 라이스</span>
              <span class="LineUp_number__e5">41</span>
              <span class="LineUp_name__d4"> 카이 하베르츠 </span>
            </div>
            <div class="LineUp_away_team__f6">
              <span class="LineUp_name__d4">올리 왓킨스</span>
            </div>
            <table><tbody>
              <tr><td><span>에드워드 은케티아</span></td><td><span>알렉스 모레노</span></td></tr>
              <tr><td><span>파비우 비에이라</span></td><td></td></tr>
            </tbody></table>
          </section>
        </div></body></html>
    "#;

    const RELAY_HTML: &str = r#"
        <html><body><div id="content">
          <section class="Home_game_head__a1">
            <em>H아스날</em><img src="https://img/home.png">
            <em>아스톤 빌라</em><img src="https://img/away.png">
          </section>
          <section class="Home_game_panel__b2">
            <div class="relay_list_area"><ul>
              <li><div><span></span></div><div><p>경기가 종료되었습니다.</p></div></li>
              <li>
                <div><span>87'</span><span class="status"><span class="blind">골</span></span></div>
                <div><p>골! <strong>올리 왓킨스</strong>의 골로 아스톤 빌라, 0-2까지 점수차를 벌립니다.</p><strong>올리 왓킨스</strong></div>
              </li>
              <li>
                <div><span>79'</span><span class="status"><span class="blind">교체</span></span></div>
                <div><p>아스날, 가브리에우 제주스대신 파비우 비에이라 들어갑니다.</p><strong>파비우 비에이라</strong></div>
              </li>
              <li><div><span>HT</span></div><div><p>전반전 종료.</p></div></li>
              <li>
                <div><span>63'</span><span class="status"><span class="blind">경고</span></span></div>
                <div><p>아스날의 카이 하베르츠, 경고를 받습니다.</p></div>
              </li>
              <li><div><span>12'</span></div><div><p>아스날, 자기 진영에서의 프리킥.</p></div></li>
            </ul></div>
          </section>
        </div></body></html>
    "#;

    #[test]
    fn roster_collects_lineups_and_substitutes() {
        let roster = parse_roster(LINEUP_HTML).unwrap();

        assert_eq!(roster.side_of("데클런 라이스"), Some(Side::Home));
        assert_eq!(roster.side_of("카이 하베르츠"), Some(Side::Home));
        assert_eq!(roster.side_of("올리 왓킨스"), Some(Side::Away));
        assert_eq!(roster.side_of("에드워드 은케티아"), Some(Side::Home));
        assert_eq!(roster.side_of("알렉스 모레노"), Some(Side::Away));
        assert_eq!(roster.side_of("파비우 비에이라"), Some(Side::Home));
        assert_eq!(roster.side_of("41"), None);
        assert_eq!(roster.len(), 6);
    }

    #[test]
    fn roster_without_panel_is_fatal() {
        let html = r#"<div id="content"><section class="Other"></section></div>"#;
        assert!(parse_roster(html).is_err());
        assert!(parse_roster("<html></html>").is_err());
    }

    #[test]
    fn teams_strip_home_marker() {
        let (home, away) = parse_teams(RELAY_HTML).unwrap();
        assert_eq!(home.name, "아스날");
        assert_eq!(home.logo, "https://img/home.png");
        assert_eq!(away.name, "아스톤 빌라");
        assert_eq!(away.logo, "https://img/away.png");
    }

    #[test]
    fn relay_feed_categorizes_entries() {
        let feed = parse_relay_feed(RELAY_HTML).unwrap();
        let categories: Vec<_> = feed.iter().map(|e| e.category).collect();

        assert_eq!(
            categories,
            vec![
                Category::MatchEnd,
                Category::Goal,
                Category::Substitution,
                Category::HalfEnd,
                Category::Caution,
                Category::None,
            ]
        );

        let goal = &feed[1];
        assert_eq!(goal.time, "87'");
        assert_eq!(goal.name.as_deref(), Some("올리 왓킨스"));
        assert!(goal.desc.starts_with("골! 올리 왓킨스의 골로"));
        assert_eq!(goal.side, Some(Side::None));

        assert_eq!(feed[0].side, None);
        assert_eq!(feed[2].player_in.as_deref(), Some(""));
        assert_eq!(feed[4].name, None);
    }

    #[test]
    fn parsed_pages_are_chronological() {
        let pages = RenderedPages {
            lineup: LINEUP_HTML.to_string(),
            relay:  RELAY_HTML.to_string(),
        };
        let scraped = parse_pages(&pages).unwrap();
        let times: Vec<_> = scraped.record.timeline.iter().map(|e| e.time.as_str()).collect();

        assert_eq!(times, vec!["12'", "63'", "HT", "79'", "87'", ""]);
        assert_eq!(scraped.record.highlights().timeline.len(), 4);
    }

    #[test]
    fn relay_entry_without_description_is_fatal() {
        let html = r#"<div id="content"><div class="relay_list_area">
            <li><div><span>3'</span></div><div></div></li>
        </div></div>"#;
        assert!(parse_relay_feed(html).is_err());
    }

    #[test]
    fn lineup_without_names_is_fatal() {
        let html = r#"<div id="content"><section class="Home_game_panel__b2">
            <div class="LineUp_home_team__c3"></div>
            <div class="LineUp_away_team__f6"></div>
            <table><tbody></tbody></table>
        </section></div>"#;
        let err = parse_roster(html).unwrap_err();
        assert!(err.to_string().contains("no home players"), "{err}");
    }

    #[test]
    fn lineup_missing_one_side_is_fatal() {
        let html = LINEUP_HTML
            .replace(r#"<span class="LineUp_name__d4">올리 왓킨스</span>"#, "")
            .replace("<span>알렉스 모레노</span>", "");
        let err = parse_roster(&html).unwrap_err();
        assert!(err.to_string().contains("no away players"), "{err}");
    }

    #[test]
    fn relay_without_list_is_fatal() {
        let html = r#"<html><body><div id="content">
            <section class="Home_game_head__a1">
              <em>H아스날</em><img src="https://img/home.png">
              <em>아스톤 빌라</em><img src="https://img/away.png">
            </section>
        </div></body></html>"#;
        assert!(parse_teams(html).is_ok());
        assert!(parse_relay_feed(html).is_err());

        let pages = RenderedPages {
            lineup: LINEUP_HTML.to_string(),
            relay:  html.to_string(),
        };
        assert!(parse_pages(&pages).is_err());
    }

    #[test]
    fn relay_with_empty_list_is_fatal() {
        let html = r#"<div id="content"><div class="relay_list_area"><ul></ul></div></div>"#;
        assert!(parse_relay_feed(html).is_err());
    }

    #[test]
    fn collapsed_timeline_section_is_fatal() {
        let html = RELAY_HTML.replace(
            r#"<div class="relay_list_area">"#,
            r#"<a class="TimeLine_button__z9" aria-pressed="false">전반</a><div class="relay_list_area">"#,
        );
        let err = parse_relay_feed(&html).unwrap_err();
        assert!(err.to_string().contains("collapsed"), "{err}");

        let expanded = html.replace(r#"aria-pressed="false""#, r#"aria-pressed="true""#);
        assert_eq!(parse_relay_feed(&expanded).unwrap().len(), 6);
    }

    #[test]
    fn urls_follow_match_id() {
        let scraper = MatchScraper::new(
            ScraperConfig {
                base_url: "https://example.test/game/".into(),
                ..ScraperConfig::default()
            },
            std::env::temp_dir().join("match_scraper_urls"),
        );
        assert_eq!(scraper.lineup_url("2024"), "https://example.test/game/2024/lineup");
        assert_eq!(scraper.relay_url("2024"), "https://example.test/game/2024/relay");
    }
}
