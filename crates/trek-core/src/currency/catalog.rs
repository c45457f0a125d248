//! Supported currencies with display names and symbols.

use crate::alerts::Locale;
use crate::util::round_money;

/// A supported ISO-4217 currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    pub code: &'static str,
    pub name: &'static str,
    pub name_es: &'static str,
    pub symbol: &'static str,
}

impl Currency {
    #[must_use]
    pub const fn display_name(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.name,
            Locale::Es => self.name_es,
        }
    }
}

const fn currency(
    code: &'static str,
    name: &'static str,
    name_es: &'static str,
    symbol: &'static str,
) -> Currency {
    Currency {
        code,
        name,
        name_es,
        symbol,
    }
}

pub const CURRENCIES: &[Currency] = &[
    currency("USD", "US Dollar", "Dólar Estadounidense", "$"),
    currency("EUR", "Euro", "Euro", "€"),
    currency("GBP", "Pound Sterling", "Libra Esterlina", "£"),
    currency("JPY", "Japanese Yen", "Yen Japonés", "¥"),
    currency("AUD", "Australian Dollar", "Dólar Australiano", "A$"),
    currency("CAD", "Canadian Dollar", "Dólar Canadiense", "C$"),
    currency("CHF", "Swiss Franc", "Franco Suizo", "CHF"),
    currency("CNY", "Chinese Yuan", "Yuan Chino", "¥"),
    currency("SEK", "Swedish Krona", "Corona Sueca", "kr"),
    currency("NZD", "New Zealand Dollar", "Dólar Neozelandés", "NZ$"),
    currency("MXN", "Mexican Peso", "Peso Mexicano", "MX$"),
    currency("SGD", "Singapore Dollar", "Dólar de Singapur", "S$"),
    currency("HKD", "Hong Kong Dollar", "Dólar de Hong Kong", "HK$"),
    currency("NOK", "Norwegian Krone", "Corona Noruega", "kr"),
    currency("KRW", "South Korean Won", "Won Surcoreano", "₩"),
    currency("TRY", "Turkish Lira", "Lira Turca", "₺"),
    currency("RUB", "Russian Ruble", "Rublo Ruso", "₽"),
    currency("INR", "Indian Rupee", "Rupia India", "₹"),
    currency("BRL", "Brazilian Real", "Real Brasileño", "R$"),
    currency("ZAR", "South African Rand", "Rand Sudafricano", "R"),
    currency("AED", "UAE Dirham", "Dirham de los Emiratos", "د.إ"),
    currency("ARS", "Argentine Peso", "Peso Argentino", "$"),
    currency("CLP", "Chilean Peso", "Peso Chileno", "$"),
    currency("COP", "Colombian Peso", "Peso Colombiano", "$"),
    currency("PEN", "Peruvian Sol", "Sol Peruano", "S/"),
    currency("VEF", "Venezuelan Bolívar", "Bolívar Venezolano", "Bs."),
    currency("UYU", "Uruguayan Peso", "Peso Uruguayo", "$U"),
    currency("PYG", "Paraguayan Guaraní", "Guaraní Paraguayo", "₲"),
    currency("BOB", "Bolivian Boliviano", "Boliviano", "Bs."),
    currency("DOP", "Dominican Peso", "Peso Dominicano", "RD$"),
    currency("CRC", "Costa Rican Colón", "Colón Costarricense", "₡"),
    currency("GTQ", "Guatemalan Quetzal", "Quetzal Guatemalteco", "Q"),
    currency("HNL", "Honduran Lempira", "Lempira Hondureño", "L"),
    currency("NIO", "Nicaraguan Córdoba", "Córdoba Nicaragüense", "C$"),
    currency("PAB", "Panamanian Balboa", "Balboa Panameño", "B/."),
    currency("VES", "Venezuelan Bolívar Soberano", "Bolívar Soberano", "Bs.S"),
];

/// Codes shown first when picking a currency.
pub const POPULAR_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "AUD", "CAD", "MXN", "BRL", "ARS", "CLP", "COP", "PEN",
];

/// Normalize a user-typed currency code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Look up a currency by code, case-insensitively.
#[must_use]
pub fn find(code: &str) -> Option<&'static Currency> {
    let code = normalize_code(code);
    CURRENCIES.iter().find(|currency| currency.code == code)
}

#[must_use]
pub fn is_supported(code: &str) -> bool {
    find(code).is_some()
}

/// Popular currencies first, then the rest in catalog order.
pub fn ordered_for_picker() -> impl Iterator<Item = &'static Currency> {
    let popular = POPULAR_CODES.iter().filter_map(|code| find(code));
    let rest = CURRENCIES
        .iter()
        .filter(|currency| !POPULAR_CODES.contains(&currency.code));
    popular.chain(rest)
}

/// Render an amount with its currency symbol, e.g. `€ 3.50`.
///
/// Unknown codes are rendered with the code itself.
#[must_use]
pub fn format_amount(amount: f64, code: &str) -> String {
    let code = normalize_code(code);
    let symbol = find(&code).map_or(code.as_str(), |currency| currency.symbol);
    format!("{symbol} {:.2}", round_money(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_size_and_unique_codes() {
        assert_eq!(CURRENCIES.len(), 36);
        let mut codes: Vec<_> = CURRENCIES.iter().map(|currency| currency.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 36);
    }

    #[test]
    fn test_popular_codes_are_in_catalog() {
        assert!(POPULAR_CODES.iter().all(|code| is_supported(code)));
        let ordered: Vec<_> = ordered_for_picker().map(|currency| currency.code).collect();
        assert_eq!(&ordered[..POPULAR_CODES.len()], POPULAR_CODES);
        assert_eq!(ordered.len(), CURRENCIES.len());
    }

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find(" eur ").map(|currency| currency.symbol), Some("€"));
        assert!(find("XYZ").is_none());
        assert_eq!(
            find("BRL").map(|currency| currency.display_name(Locale::Es)),
            Some("Real Brasileño")
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(3.5, "eur"), "€ 3.50");
        assert_eq!(format_amount(1.005, "USD"), "$ 1.01");
        assert_eq!(format_amount(10.0, "XYZ"), "XYZ 10.00");
    }
}
