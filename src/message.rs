use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{BotError, Result};
use crate::filter::display_name;
use crate::types::{
    DisplayMessage, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage, SaleEvent,
};

/// Embed accent color (`#0099ff`).
pub const EMBED_COLOR: u32 = 0x0099ff;

/// Appended to the asset name in the embed title.
pub const SOLD_SUFFIX: &str = " VENDIDO!";

/// Rendered in place of a missing buyer or seller address.
pub const UNKNOWN_ACCOUNT: &str = "Desconocido";

pub const ETHER_SYMBOL: &str = "Ξ";

const WEI_DECIMALS: u32 = 18;

const BOT_NAME: &str = "JASArmas OpenSeaBot";
const BOT_ICON_URL: &str = "https://i.imgur.com/E1wwtQH.png";
const BOT_REPO_URL: &str = "https://github.com/jasarmas/opensea-discord-bot-updates";
const FOOTER_TEXT: &str = "Vendido en OpenSea";

/// Build the announcement embed for one sale.
///
/// Fails only when `total_price` is present but not a wei integer.
pub fn build_message(sale: &SaleEvent) -> Result<DisplayMessage> {
    let asset = sale.asset.as_ref();
    let name = display_name(asset.and_then(|a| a.name.as_deref()));

    let price = format!(
        "{}{ETHER_SYMBOL}",
        format_ether(sale.total_price.as_deref())?
    );
    let buyer = account_or_unknown(sale.winner_account.as_ref().and_then(|a| a.address.as_deref()));
    let seller = account_or_unknown(sale.seller.as_ref().and_then(|a| a.address.as_deref()));

    Ok(DisplayMessage {
        title: format!("{name}{SOLD_SUFFIX}"),
        url: asset.and_then(|a| a.permalink.clone()),
        color: EMBED_COLOR,
        author: EmbedAuthor {
            name: BOT_NAME.to_string(),
            icon_url: BOT_ICON_URL.to_string(),
            url: BOT_REPO_URL.to_string(),
        },
        thumbnail: asset
            .and_then(|a| a.collection.as_ref())
            .and_then(|c| c.image_url.clone())
            .map(|url| EmbedImage { url }),
        image: asset
            .and_then(|a| a.image_url.clone())
            .map(|url| EmbedImage { url }),
        fields: vec![
            field("Nombre", name),
            field("Monto en ETH", &price),
            field("Comprador", buyer),
            field("Vendedor", seller),
        ],
        timestamp: sale.created_date.as_deref().and_then(parse_utc_naive),
        footer: EmbedFooter {
            text: FOOTER_TEXT.to_string(),
            icon_url: BOT_ICON_URL.to_string(),
        },
    })
}

/// Convert a wei amount to an ether string without the symbol.
///
/// Missing or zero renders as `"0"`; anything else keeps at least one
/// fractional digit, so one ether is `"1.0"`.
pub fn format_ether(wei: Option<&str>) -> Result<String> {
    let raw = match wei.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok("0".to_string()),
    };

    let amount: u128 = raw
        .parse()
        .map_err(|e| BotError::parse("sale price", format!("{raw:?}: {e}")))?;
    if amount == 0 {
        return Ok("0".to_string());
    }

    let mantissa = i128::try_from(amount)
        .map_err(|e| BotError::parse("sale price", format!("{raw:?}: {e}")))?;
    let ether = Decimal::try_from_i128_with_scale(mantissa, WEI_DECIMALS)
        .map_err(|e| BotError::parse("sale price", format!("{raw:?}: {e}")))?
        .normalize();

    let mut text = ether.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    Ok(text)
}

/// Interpret an OpenSea `created_date` (no offset) as UTC.
///
/// Strings that already carry an offset are accepted too.
pub fn parse_utc_naive(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

fn account_or_unknown(address: Option<&str>) -> &str {
    match address {
        Some(a) if !a.is_empty() => a,
        _ => UNKNOWN_ACCOUNT,
    }
}

fn field(name: &str, value: &str) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: value.to_string(),
        inline: false,
    }
}
