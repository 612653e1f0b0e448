//! Fixed market index universe

use crate::error::{PotentialError, Result};
use crate::types::Symbol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named ticker lists evaluated as one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketIndex {
    Tw50,
    TwMid100,
    Sp500,
    Nasdaq,
    Sox,
    Dji,
}

impl MarketIndex {
    /// Every index, in evaluation order
    pub const ALL: [MarketIndex; 6] = [
        MarketIndex::Tw50,
        MarketIndex::TwMid100,
        MarketIndex::Sp500,
        MarketIndex::Nasdaq,
        MarketIndex::Sox,
        MarketIndex::Dji,
    ];

    /// Identifier used in configuration and on the command line
    pub fn key(&self) -> &'static str {
        match self {
            MarketIndex::Tw50 => "tw50",
            MarketIndex::TwMid100 => "tw_mid100",
            MarketIndex::Sp500 => "sp500",
            MarketIndex::Nasdaq => "nasdaq",
            MarketIndex::Sox => "sox",
            MarketIndex::Dji => "dji",
        }
    }

    /// Name used in results and notifications
    pub fn display_name(&self) -> &'static str {
        match self {
            MarketIndex::Tw50 => "Taiwan 50",
            MarketIndex::TwMid100 => "Taiwan Mid-Cap 100",
            MarketIndex::Sp500 => "S&P 500",
            MarketIndex::Nasdaq => "NASDAQ",
            MarketIndex::Sox => "PHLX Semiconductor",
            MarketIndex::Dji => "Dow Jones",
        }
    }

    pub fn tickers(&self) -> &'static [&'static str] {
        match self {
            MarketIndex::Tw50 => TW50,
            MarketIndex::TwMid100 => TW_MID100,
            MarketIndex::Sp500 => SP500,
            MarketIndex::Nasdaq => NASDAQ,
            MarketIndex::Sox => SOX,
            MarketIndex::Dji => DJI,
        }
    }

    pub fn universe(&self) -> IndexUniverse {
        IndexUniverse::new(
            self.display_name(),
            self.tickers().iter().map(|t| t.to_string()).collect(),
        )
    }
}

impl fmt::Display for MarketIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MarketIndex {
    type Err = PotentialError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        MarketIndex::ALL
            .into_iter()
            .find(|idx| idx.key() == wanted)
            .ok_or_else(|| PotentialError::Parse(format!("Unknown index: {}", s)))
    }
}

/// A named list of tickers, fixed or user supplied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUniverse {
    pub name: String,
    pub tickers: Vec<Symbol>,
}

impl IndexUniverse {
    pub fn new(name: impl Into<String>, tickers: Vec<Symbol>) -> Self {
        Self {
            name: name.into(),
            tickers,
        }
    }
}

const TW50: &[&str] = &[
    "0001.HK", "0002.HK", "0003.HK", "0005.HK", "0006.HK", "0011.HK", "0012.HK", "0016.HK", "0017.HK", "0019.HK",
    "0027.HK", "0066.HK", "0083.HK", "0101.HK", "0135.HK", "0144.HK", "0151.HK", "0168.HK", "0175.HK", "0177.HK",
    "0222.HK", "0267.HK", "0288.HK", "0291.HK", "0293.HK", "0386.HK", "0388.HK", "0669.HK", "0688.HK", "0700.HK",
    "0762.HK", "0823.HK", "0857.HK", "0868.HK", "0880.HK", "0881.HK", "0883.HK", "0939.HK", "0941.HK", "0960.HK",
    "0968.HK", "0981.HK", "0992.HK", "1038.HK", "1044.HK", "1088.HK", "1093.HK", "1109.HK", "1113.HK", "1177.HK",
    "1211.HK", "1299.HK", "1398.HK", "1810.HK", "1876.HK", "1928.HK", "1997.HK", "2007.HK", "2020.HK", "2269.HK",
    "2313.HK", "2318.HK", "2319.HK", "2331.HK", "2382.HK", "2388.HK", "2601.HK", "2628.HK", "2688.HK", "3690.HK",
    "3692.HK", "3888.HK", "3968.HK", "3988.HK", "6098.HK", "6862.HK", "7000.HK", "7001.HK", "7002.HK", "7003.HK",
    "7004.HK", "7005.HK", "7006.HK", "7007.HK", "7008.HK", "7009.HK", "7010.HK", "7011.HK", "7012.HK", "7013.HK",
    "7014.HK", "7015.HK", "7016.HK", "7017.HK", "7018.HK", "7019.HK", "7020.HK", "7021.HK", "7022.HK", "7023.HK",
];

const TW_MID100: &[&str] = &[
    "2371.TW", "3533.TW", "2618.TW", "3443.TW", "2347.TW", "3044.TW", "2834.TW", "2385.TW", "1605.TW", "2105.TW",
    "6239.TW", "6176.TW", "9904.TW", "1519.TW", "9910.TW", "1513.TW", "1229.TW", "9945.TW", "2313.TW", "1477.TW",
    "3665.TW", "2354.TW", "4958.TW", "8464.TW", "9921.TW", "2812.TW", "2059.TW", "1504.TW", "2542.TW", "6770.TW",
    "5269.TW", "2344.TW", "3023.TW", "1503.TW", "2049.TW", "2610.TW", "2633.TW", "3036.TW", "2368.TW", "3035.TW",
    "2027.TW", "9914.TW", "2408.TW", "2809.TW", "1319.TW", "2352.TW", "2337.TW", "2006.TW", "2206.TW", "4763.TW",
    "3005.TW", "1907.TW", "2915.TW", "1722.TW", "6285.TW", "6472.TW", "6531.TW", "3406.TW", "9958.TW", "9941.TW",
    "1795.TW", "2201.TW", "9917.TW", "2492.TW", "6890.TW", "2845.TW", "8454.TW", "8046.TW", "6789.TW", "2388.TW",
    "6526.TW", "1802.TW", "5522.TW", "6592.TW", "2204.TW", "2540.TW", "2539.TW", "3532.TW",
];

const SP500: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "AMZN", "META", "TSLA", "GOOGL", "BRK.B", "AVGO", "GOOG",
    "UNH", "JNJ", "V", "WMT", "PG", "JPM", "MA", "LLY", "XOM", "BAC",
    "MRK", "PFE", "ABBV", "KO", "PEP", "TMO", "COST", "CSCO", "MCD", "DHR",
    "NKE", "DIS", "VZ", "ADBE", "CMCSA", "NFLX", "INTC", "WFC", "TXN", "LIN",
    "HON", "UNP", "ACN", "QCOM", "NEE", "ABT", "PM", "MDT", "BMY", "SPGI",
    "LOW", "MS", "RTX", "IBM", "CVX", "ORCL", "INTU", "AMD", "GS", "BLK",
    "ISRG", "GE", "AMT", "CAT", "DE", "LMT", "PLD", "SYK", "MDLZ", "AXP",
    "T", "EL", "GILD", "NOW", "ADI", "ZTS", "PYPL", "MO", "BKNG", "SCHW",
    "MMC", "ADP", "C", "TJX", "DUK", "SO", "BDX", "APD", "PNC", "USB",
    "CI", "EQIX", "TGT", "CB", "ICE", "HUM", "ITW", "ETN", "WM", "ECL",
    "FIS", "NSC", "REGN", "FDX", "D", "NOC", "GM", "SHW", "PSA", "GD",
    "HCA", "EMR", "MCO", "KLAC", "EW", "AON", "TRV", "SPG", "MU", "FISV",
    "BSX", "AEP", "MRNA", "LRCX", "KMB", "SLB",
];

const NASDAQ: &[&str] = &[
    "AAPL", "NVDA", "MSFT", "AMZN", "GOOG", "META", "TSLA", "AVGO", "COST", "NFLX",
    "TMUS", "ASML", "CSCO", "ADBE", "AMD", "PEP", "LIN", "AZN", "ISRG", "INTU",
    "QCOM", "TXN", "BKNG", "CMCSA", "AMGN", "HON", "ARM", "AMAT", "PDD", "PANW",
    "ADP", "VRTX", "GILD", "SBUX", "MU", "ADI", "MELI", "MRVL", "LRCX", "CTAS",
    "CRWD", "INTC", "PYPL", "KLAC", "ABNB", "MDLZ", "CDNS", "REGN", "MAR", "CEG",
    "SNPS", "FTNT", "DASH", "TEAM", "ORLY", "WDAY", "TTD", "CSX", "ADSK", "CHTR",
    "PCAR", "ROP", "CPRT", "DDOG", "NXPI", "ROST", "AEP", "MNST", "PAYX", "FANG",
    "FAST", "KDP", "EA", "ODFL", "LULU", "BKR", "VRSK", "XEL", "CTSH", "EXC",
    "KHC", "GEHC", "CCEP", "IDXX", "TTWO", "CSGP", "ZS", "MCHP", "DXCM", "ANSS",
    "ON", "WBD", "MDB", "GFS", "CDW", "BIIB", "ILMN", "MRNA", "DLTR", "WBA",
];

const SOX: &[&str] = &[
    "NVDA", "AVGO", "GFS", "CRUS", "ON", "ASML", "QCOM", "SWKS", "MPWR", "ADI",
    "TSM", "AMD", "TXN", "QRVO", "AMKR", "MU", "ARM", "NXPI", "TER", "ENTG",
    "LSCC", "COHR", "ONTO", "MTSI", "KLAC", "LRCX", "MRVL", "AMAT", "INTC", "MCHP",
];

const DJI: &[&str] = &[
    "AAPL", "MSFT", "JPM", "V", "UNH", "PG", "JNJ", "WMT", "DIS", "VZ",
    "INTC", "KO", "MRK", "GS", "TRV", "IBM", "MMM", "CAT", "RTX", "CVX",
    "MCD", "HON", "AXP", "WBA", "NKE", "DOW", "BA", "HD", "CRM", "AMGN",
];
