use rand::Rng;

/// Decides, per hook observation, whether the current module is sampled.
/// `ordered` discovers every distinct module
/// during the first step and then round-robins a single victim per
/// subsequent step; `random` is an independent Bernoulli trial per hook.
#[derive(Debug)]
pub enum Sampler {
    Ordered {
        rate: f64,
        discovered: Vec<String>,
        sorted: bool,
        victim: usize,
    },
    Random {
        rate: f64,
    },
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::Ordered {
            rate: 1.0,
            discovered: Vec::new(),
            sorted: false,
            victim: 0,
        }
    }
}

impl Sampler {
    /// Parses `"ordered:0.5"` / `"random:0.1"`. Invalid input reverts to
    /// `ordered:1.0`.
    pub fn parse(spec: &str) -> Self {
        let Some((mode, rate)) = spec.split_once(':') else {
            return Self::default();
        };
        let Ok(rate) = rate.parse::<f64>() else {
            return Self::default();
        };
        if !(rate > 0.0 && rate <= 1.0) {
            return Self::default();
        }
        match mode {
            "ordered" => Sampler::Ordered {
                rate,
                discovered: Vec::new(),
                sorted: false,
                victim: 0,
            },
            "random" => Sampler::Random { rate },
            _ => Self::default(),
        }
    }

    /// Registers a module seen during the discovery step. No-op outside
    /// `Ordered` mode or once sorting has happened.
    pub fn observe_discovery(&mut self, module_id: &str) {
        if let Sampler::Ordered {
            discovered, sorted, ..
        } = self
        {
            if !*sorted && !discovered.iter().any(|m| m == module_id) {
                discovered.push(module_id.to_string());
            }
        }
    }

    /// Called once, at the first `post_step`: sorts discovered modules by
    /// name length ascending and fixes the round-robin order.
    pub fn finish_discovery(&mut self) {
        if let Sampler::Ordered {
            discovered, sorted, ..
        } = self
        {
            discovered.sort_by_key(|m| m.len());
            *sorted = true;
        }
    }

    /// Advances the round-robin pointer; called at every `post_step` after
    /// discovery has finished.
    pub fn rotate(&mut self) {
        if let Sampler::Ordered {
            discovered, victim, ..
        } = self
        {
            if !discovered.is_empty() {
                *victim = (*victim + 1) % discovered.len();
            }
        }
    }

    pub fn should_sample(&self, module_id: &str) -> bool {
        match self {
            Sampler::Ordered {
                discovered,
                sorted,
                victim,
                ..
            } => {
                if !*sorted || discovered.is_empty() {
                    return false;
                }
                discovered[*victim] == module_id
            }
            Sampler::Random { rate } => rand::thread_rng().gen_bool((*rate).clamp(0.0, 1.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_spec_reverts_to_ordered_default() {
        let s = Sampler::parse("bogus");
        assert!(matches!(s, Sampler::Ordered { rate, .. } if rate == 1.0));
        let s = Sampler::parse("ordered:2.0");
        assert!(matches!(s, Sampler::Ordered { rate, .. } if rate == 1.0));
    }

    #[test]
    fn random_mode_parses_rate() {
        let s = Sampler::parse("random:0.25");
        assert!(matches!(s, Sampler::Random { rate } if rate == 0.25));
    }

    #[test]
    fn ordered_round_robins_by_name_length() {
        let mut s = Sampler::parse("ordered:1.0");
        s.observe_discovery("bbb");
        s.observe_discovery("a");
        s.observe_discovery("cc");
        s.finish_discovery();
        // sorted by length ascending: "a", "cc", "bbb"
        assert!(s.should_sample("a"));
        s.rotate();
        assert!(s.should_sample("cc"));
        s.rotate();
        assert!(s.should_sample("bbb"));
        s.rotate();
        assert!(s.should_sample("a"));
    }

    #[test]
    fn ordered_does_not_sample_before_discovery_finishes() {
        let mut s = Sampler::parse("ordered:1.0");
        s.observe_discovery("a");
        assert!(!s.should_sample("a"));
    }
}
