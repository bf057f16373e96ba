//! Prompt templates for the reasoning engine.
//!
//! Both prompts ask for a single JSON object so the answer can be parsed
//! with `serde_json` directly:
//!
//! - [`url_filter`]: `{"promising_urls": [...]}`
//! - [`gig_extraction`]: `{"gigs": [{title, date, venue_name, ...}]}`

use std::fmt::Write;

use crate::models::SearchResult;

/// The single locale this crawler targets.
pub const TARGET_LOCALE: &str = "Athens, Greece";

/// Prompt for Pass 1: pick the search results worth scraping.
pub fn url_filter(results: &[SearchResult]) -> String {
    let mut listing = String::new();
    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            listing.push_str("\n\n");
        }
        let _ = write!(
            listing,
            "URL: {}\nTitle: {}\nDescription: {}",
            r.url,
            r.title,
            r.description.as_deref().unwrap_or("N/A")
        );
    }

    format!(
        r#"You are helping to find live music events, concerts, and gigs in {locale}.

Below are search results from a web search. Your task is to filter these results and identify the most promising URLs that are likely to contain information about upcoming live music events in {locale}.

**Selection Criteria:**
- URLs from known event listing sites (e.g., viva.gr, more.com, ticketservices.gr)
- URLs with event calendars or "what's on" pages
- URLs from music venues with upcoming shows
- URLs with specific event details (dates, artist names)
- URLs from local music blogs or news sites

**Exclude:**
- General news sites without specific event listings
- Social media profile pages (unless they have clear event information)
- Ticket resale/marketplace sites
- URLs about past events
- Locations outside {locale}

**Search Results:**

{listing}

**Instructions:**
Select 5-10 of the most promising URLs to scrape. Return your response as a JSON object with this exact structure:

{{
  "promising_urls": [
    "https://example.com/events",
    "https://another-site.gr/calendar"
  ]
}}

Only include URLs that you are confident will contain useful information about upcoming live music events."#,
        locale = TARGET_LOCALE,
    )
}

/// Prompt for Pass 2: pull structured gigs out of one page.
pub fn gig_extraction(url: &str, content: &str) -> String {
    format!(
        r#"You are extracting structured information about live music events, concerts, and gigs in {locale} from web page content.

**Source URL:** {url}

**Page Content:**

{content}

**Task:**
Extract all upcoming music events from this content. For each event, extract the following fields:

- **title** (required): Name of the event, band/artist name, or concert title
- **date** (required): Event date and time in ISO format (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
- **venue_name** (required): Name of the venue where the event takes place
- **description** (optional): Event description, genre, or additional details
- **price** (optional): Ticket price (e.g., "€15", "Free", "€20-€30")
- **image_url** (optional): URL of event poster or image

**Important Guidelines:**
1. Only extract events that are clearly in {locale}
2. Only extract future events (skip past events)
3. If the date is ambiguous or missing, skip that event
4. Use the venue name from the content, not generic descriptions
5. Keep titles concise and clear (band/artist name is enough)
6. If multiple events are listed, extract all of them
7. If no events are found, return an empty array

**Output Format:**
Return your response as a JSON object with this exact structure:

{{
  "gigs": [
    {{
      "title": "Artist Name",
      "date": "2026-02-15T20:00:00",
      "venue_name": "Venue Name",
      "description": "Optional description",
      "price": "€15",
      "image_url": "https://example.com/poster.jpg"
    }}
  ]
}}

Extract all events now:"#,
        locale = TARGET_LOCALE,
    )
}
