//! Contract cards and page rendering.

use contrak_core::{ContractRecord, abi_url, chain_name, explorer_url, tx_url};
use minijinja::{Environment, context};
use serde::Serialize;
use url::form_urlencoded;

const DEPLOYED_AT_FORMAT: &str = "%b %d %Y @ %H:%M";

/// Everything a contract card displays, already resolved to strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractCard {
    pub id: i64,
    pub name: String,
    pub chain_name: String,
    pub contract_address: String,
    pub explorer_url: Option<String>,
    pub abi_url: Option<String>,
    pub tx_url: Option<String>,
    pub github_url: Option<String>,
    pub git_username: Option<String>,
    pub deployed_at: String,
    pub history_url: String,
    pub selected: bool,
}

impl ContractCard {
    pub fn from_record(record: &ContractRecord, selected: bool) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            chain_name: chain_name(&record.chain_id),
            contract_address: record.contract_address.clone(),
            explorer_url: explorer_url(&record.chain_id, &record.contract_address),
            abi_url: abi_url(&record.chain_id, &record.contract_address),
            tx_url: record
                .deployment_transaction_hash
                .as_deref()
                .filter(|h| !h.is_empty())
                .and_then(|h| tx_url(&record.chain_id, h)),
            github_url: record.github_url.clone().filter(|u| !u.is_empty()),
            git_username: record.git_username.clone().filter(|u| !u.is_empty()),
            deployed_at: record.created_at.format(DEPLOYED_AT_FORMAT).to_string(),
            history_url: history_url(&record.contract_history_id, record.id),
            selected,
        }
    }
}

/// Link to a history page with `contract_id` highlighted. The history id is
/// percent-encoded as a single path segment.
fn history_url(history_id: &str, contract_id: i64) -> String {
    // form encoding writes spaces as `+`, which a path would keep literally
    let segment = form_urlencoded::byte_serialize(history_id.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("/contracts/history/{segment}?contractId={contract_id}")
}

/// Cards for every record, newest deployment first.
pub fn cards_for(records: &[ContractRecord]) -> Vec<ContractCard> {
    let mut sorted: Vec<&ContractRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
        .into_iter()
        .map(|r| ContractCard::from_record(r, false))
        .collect()
}

/// Which deployment in a history view should be highlighted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub contract_id: Option<i64>,
    pub contract_address: Option<String>,
}

impl Selection {
    fn matches(&self, record: &ContractRecord) -> bool {
        self.contract_id == Some(record.id)
            || self
                .contract_address
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(&record.contract_address))
    }
}

/// Cards for one contract history, newest first, with the selection marked.
pub fn history_cards(
    records: &[ContractRecord],
    history_id: &str,
    selection: &Selection,
) -> Vec<ContractCard> {
    let mut matching: Vec<&ContractRecord> = records
        .iter()
        .filter(|r| r.contract_history_id == history_id)
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
        .into_iter()
        .map(|r| ContractCard::from_record(r, selection.matches(r)))
        .collect()
}

/// Compiled page templates.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("card.html", include_str!("../templates/card.html"))?;
        env.add_template("index.html", include_str!("../templates/index.html"))?;
        env.add_template("history.html", include_str!("../templates/history.html"))?;
        env.add_template("error.html", include_str!("../templates/error.html"))?;
        Ok(Self { env })
    }

    pub fn index(&self, cards: &[ContractCard]) -> Result<String, minijinja::Error> {
        self.env
            .get_template("index.html")?
            .render(context! { cards => cards })
    }

    pub fn history(
        &self,
        history_id: &str,
        cards: &[ContractCard],
    ) -> Result<String, minijinja::Error> {
        self.env
            .get_template("history.html")?
            .render(context! { history_id => history_id, cards => cards })
    }

    pub fn error(&self) -> Result<String, minijinja::Error> {
        self.env.get_template("error.html")?.render(context! {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, history: &str, chain: &str, minute: u32) -> ContractRecord {
        ContractRecord {
            id,
            name: format!("Contract {id}"),
            contract_history_id: history.into(),
            chain_id: chain.into(),
            contract_address: format!("0x{:040x}", id),
            deployment_transaction_hash: None,
            deployer_address: None,
            deployer_signature: None,
            org_public_key: None,
            org_signature: None,
            github_url: None,
            git_username: None,
            message: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, minute, 0).unwrap(),
        }
    }

    #[test]
    fn card_resolves_chain_and_links() {
        let mut r = record(7, "counter", "1", 7);
        r.github_url = Some("https://github.com/acme/counter/commit/abc".into());
        let card = ContractCard::from_record(&r, false);

        assert_eq!(card.chain_name, "Ethereum Mainnet");
        assert_eq!(
            card.explorer_url.as_deref(),
            Some("https://etherscan.io/address/0x0000000000000000000000000000000000000007")
        );
        assert!(card.abi_url.unwrap().ends_with("#code"));
        assert_eq!(card.deployed_at, "Mar 05 2024 @ 14:07");
        assert_eq!(card.history_url, "/contracts/history/counter?contractId=7");
    }

    #[test]
    fn history_url_encodes_history_id() {
        let card = ContractCard::from_record(&record(3, "team/counter v2?#x", "1", 0), false);
        assert_eq!(
            card.history_url,
            "/contracts/history/team%2Fcounter%20v2%3F%23x?contractId=3"
        );
    }

    #[test]
    fn card_links_deployment_transaction() {
        let mut r = record(2, "c", "11155111", 0);
        r.deployment_transaction_hash = Some("0xabc".into());
        let card = ContractCard::from_record(&r, false);
        assert_eq!(
            card.tx_url.as_deref(),
            Some("https://sepolia.etherscan.io/tx/0xabc")
        );

        let mut local = record(2, "c", "31337", 0);
        local.deployment_transaction_hash = Some("0xabc".into());
        assert!(ContractCard::from_record(&local, false).tx_url.is_none());
        assert!(ContractCard::from_record(&record(2, "c", "1", 0), false).tx_url.is_none());
    }

    #[test]
    fn card_for_local_chain_has_no_explorer() {
        let card = ContractCard::from_record(&record(1, "c", "31337", 0), false);
        assert_eq!(card.chain_name, "Hardhat");
        assert!(card.explorer_url.is_none());
        assert!(card.abi_url.is_none());
    }

    #[test]
    fn empty_github_url_is_dropped() {
        let mut r = record(1, "c", "1", 0);
        r.github_url = Some(String::new());
        assert!(ContractCard::from_record(&r, false).github_url.is_none());
    }

    #[test]
    fn cards_are_newest_first() {
        let records = vec![
            record(1, "a", "1", 1),
            record(2, "b", "1", 30),
            record(3, "c", "1", 10),
        ];
        let ids: Vec<i64> = cards_for(&records).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn history_filters_and_marks_selection() {
        let records = vec![
            record(1, "counter", "1", 1),
            record(2, "token", "1", 2),
            record(3, "counter", "1", 3),
        ];
        let selection = Selection {
            contract_id: Some(1),
            contract_address: None,
        };
        let cards = history_cards(&records, "counter", &selection);
        let summary: Vec<(i64, bool)> = cards.iter().map(|c| (c.id, c.selected)).collect();
        assert_eq!(summary, vec![(3, false), (1, true)]);
    }

    #[test]
    fn selection_by_address_ignores_case() {
        let records = vec![record(10, "counter", "1", 1)];
        let selection = Selection {
            contract_id: None,
            contract_address: Some("0x000000000000000000000000000000000000000A".into()),
        };
        assert!(history_cards(&records, "counter", &selection)[0].selected);
    }

    #[test]
    fn index_escapes_user_content() {
        let templates = Templates::new().unwrap();
        let mut r = record(1, "c", "1", 0);
        r.name = "<script>alert(1)</script>".into();
        let html = templates.index(&cards_for(&[r])).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn index_renders_cards_and_empty_state() {
        let templates = Templates::new().unwrap();
        let html = templates.index(&cards_for(&[record(4, "c", "8453", 0)])).unwrap();
        assert!(html.contains("Contract 4"));
        assert!(html.contains("Base - 0x0000000000000000000000000000000000000004"));
        assert!(html.contains("Deployed <strong>Mar 05 2024 @ 14:00</strong>"));
        assert!(!html.contains(">Transaction</a>"));

        let empty = templates.index(&[]).unwrap();
        assert!(empty.contains("No contracts have been connected yet."));
    }

    #[test]
    fn index_renders_transaction_link() {
        let templates = Templates::new().unwrap();
        let mut r = record(6, "c", "1", 0);
        r.deployment_transaction_hash = Some("0xfeed".into());
        let html = templates.index(&cards_for(&[r])).unwrap();
        assert!(html.contains("<a href=\"https://etherscan.io/tx/0xfeed\">Transaction</a>"));
    }

    #[test]
    fn history_marks_selected_card() {
        let templates = Templates::new().unwrap();
        let cards = vec![ContractCard::from_record(&record(5, "c", "1", 0), true)];
        let html = templates.history("c", &cards).unwrap();
        assert!(html.contains("card selected"));
    }

    #[test]
    fn error_page_renders() {
        let html = Templates::new().unwrap().error().unwrap();
        assert!(html.contains("Something went wrong"));
    }
}
