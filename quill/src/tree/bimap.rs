use std::hash::Hash;
use indexmap::IndexMap;

/// Why a change to a [`BiMap`] was refused.
///
/// All variants carry the obfuscated key of the entry that's in the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Collision<K> {
	/// There's already a value with that obfuscated key.
	Obf(K),
	/// The deobfuscated key is already used by the value with this obfuscated key.
	Deobf(K),
	/// There's no value with that obfuscated key.
	Missing(K),
}

#[derive(Debug, Clone)]
struct Slot<D, V> {
	deobf: Option<D>,
	value: V,
}

/// A map from obfuscated keys to values, with a second index from deobfuscated keys to the obfuscated ones.
///
/// Values without a deobfuscated key are only in the obfuscated index. Every mutating method keeps
/// both indices in sync, or returns a [`Collision`] and leaves the map as it was.
#[derive(Debug, Clone)]
pub(crate) struct BiMap<K, D, V> {
	by_obf: IndexMap<K, Slot<D, V>>,
	by_deobf: IndexMap<D, K>,
}

impl<K, D, V> Default for BiMap<K, D, V> {
	fn default() -> Self {
		BiMap {
			by_obf: IndexMap::new(),
			by_deobf: IndexMap::new(),
		}
	}
}

impl<K, D, V> BiMap<K, D, V>
where
	K: Hash + Eq + Clone,
	D: Hash + Eq + Clone,
{
	pub(crate) fn len(&self) -> usize {
		self.by_obf.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.by_obf.is_empty()
	}

	pub(crate) fn get(&self, obf: &K) -> Option<&V> {
		self.by_obf.get(obf).map(|slot| &slot.value)
	}

	pub(crate) fn get_mut(&mut self, obf: &K) -> Option<&mut V> {
		self.by_obf.get_mut(obf).map(|slot| &mut slot.value)
	}

	pub(crate) fn get_by_deobf(&self, deobf: &D) -> Option<&V> {
		self.by_deobf.get(deobf).and_then(|obf| self.get(obf))
	}

	pub(crate) fn obf_key_of(&self, deobf: &D) -> Option<&K> {
		self.by_deobf.get(deobf)
	}

	pub(crate) fn contains_obf(&self, obf: &K) -> bool {
		self.by_obf.contains_key(obf)
	}

	pub(crate) fn contains_deobf(&self, deobf: &D) -> bool {
		self.by_deobf.contains_key(deobf)
	}

	/// Checks if `obf` could be inserted with the deobfuscated key `deobf`.
	pub(crate) fn check_insert(&self, obf: &K, deobf: Option<&D>) -> Result<(), Collision<K>> {
		if self.by_obf.contains_key(obf) {
			return Err(Collision::Obf(obf.clone()));
		}
		if let Some(holder) = deobf.and_then(|deobf| self.by_deobf.get(deobf)) {
			return Err(Collision::Deobf(holder.clone()));
		}
		Ok(())
	}

	/// Checks if the value of `obf`, whether it's there or not, could get the deobfuscated key `deobf`.
	pub(crate) fn check_deobf(&self, obf: &K, deobf: Option<&D>) -> Result<(), Collision<K>> {
		match deobf.and_then(|deobf| self.by_deobf.get(deobf)) {
			Some(holder) if holder != obf => Err(Collision::Deobf(holder.clone())),
			_ => Ok(()),
		}
	}

	pub(crate) fn insert(&mut self, obf: K, deobf: Option<D>, value: V) -> Result<&mut V, Collision<K>> {
		self.check_insert(&obf, deobf.as_ref())?;

		if let Some(deobf) = &deobf {
			self.by_deobf.insert(deobf.clone(), obf.clone());
		}
		let slot = self.by_obf.entry(obf).or_insert(Slot { deobf, value });
		Ok(&mut slot.value)
	}

	/// Gets the value for `obf`, inserting the one `f` returns without a deobfuscated key if there's none.
	pub(crate) fn get_or_insert_with(&mut self, obf: K, f: impl FnOnce() -> V) -> &mut V {
		&mut self.by_obf.entry(obf)
			.or_insert_with(|| Slot { deobf: None, value: f() })
			.value
	}

	/// Removes the value from both indices, keeping the order of the remaining values.
	pub(crate) fn remove(&mut self, obf: &K) -> Option<V> {
		let slot = self.by_obf.shift_remove(obf)?;
		if let Some(deobf) = &slot.deobf {
			self.by_deobf.swap_remove(deobf);
		}
		Some(slot.value)
	}

	/// Moves the value of `obf` to the deobfuscated key `deobf`, calling `apply` on the value to update it.
	///
	/// Removing the old deobfuscated key, `apply` and inserting the new one either all happen, or nothing happens.
	pub(crate) fn set_deobf(&mut self, obf: &K, deobf: Option<D>, apply: impl FnOnce(&mut V)) -> Result<(), Collision<K>> {
		let Some(slot) = self.by_obf.get(obf) else {
			return Err(Collision::Missing(obf.clone()));
		};
		self.check_deobf(obf, deobf.as_ref())?;

		if let Some(old) = &slot.deobf {
			self.by_deobf.swap_remove(old);
		}
		if let Some(new) = &deobf {
			self.by_deobf.insert(new.clone(), obf.clone());
		}
		if let Some(slot) = self.by_obf.get_mut(obf) {
			slot.deobf = deobf;
			apply(&mut slot.value);
		}
		Ok(())
	}

	pub(crate) fn deobf_key(&self, obf: &K) -> Option<&D> {
		self.by_obf.get(obf).and_then(|slot| slot.deobf.as_ref())
	}

	pub(crate) fn values(&self) -> impl Iterator<Item=&V> {
		self.by_obf.values().map(|slot| &slot.value)
	}

	pub(crate) fn values_mut(&mut self) -> impl Iterator<Item=&mut V> {
		self.by_obf.values_mut().map(|slot| &mut slot.value)
	}

	pub(crate) fn into_values(self) -> impl Iterator<Item=V> {
		self.by_obf.into_values().map(|slot| slot.value)
	}

	pub(crate) fn keys(&self) -> impl Iterator<Item=&K> {
		self.by_obf.keys()
	}

	/// Checks that the deobfuscated index holds exactly the deobfuscated keys of the values, and nothing else.
	pub(crate) fn is_consistent(&self) -> bool {
		let mapped = self.by_obf.values().filter(|slot| slot.deobf.is_some()).count();

		mapped == self.by_deobf.len() && self.by_deobf.iter().all(|(deobf, obf)| {
			self.by_obf.get(obf).is_some_and(|slot| slot.deobf.as_ref() == Some(deobf))
		})
	}
}
