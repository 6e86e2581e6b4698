use tracing::debug;

use super::*;

impl Context {
    /// Keeps `obj` alive across collections until a matching `unpin`.
    pub fn pin(&mut self, obj: ObjectId) {
        *self.pinned.entry(obj).or_insert(0) += 1;
    }

    pub fn unpin(&mut self, obj: ObjectId) {
        if let Some(count) = self.pinned.get_mut(&obj) {
            *count -= 1;
            if *count == 0 {
                self.pinned.remove(&obj);
            }
        }
    }

    /// Mark/sweep over the arena. Objects reachable only through an
    /// interpreter's captured scopes must be passed in `extra_roots`.
    /// Returns the number of objects freed.
    pub fn collect_garbage(&mut self, extra_roots: &[ObjectId]) -> usize {
        let obj_count = self.objects.len();
        let mut marks = vec![false; obj_count];

        let mut worklist: Vec<ObjectId> = Vec::new();
        worklist.extend(self.builtins.all());
        worklist.extend(self.global);
        for (key, state) in &self.static_states {
            worklist.push(*state);
            if let ClassKey::Object(class) = key {
                worklist.push(*class);
            }
        }
        worklist.extend(self.static_initializers.keys().copied());
        worklist.extend(self.symbol_classes.values().copied());
        worklist.extend(self.pinned.keys().copied());
        worklist.extend_from_slice(extra_roots);

        while let Some(id) = worklist.pop() {
            let idx = id.index();
            if idx >= obj_count || marks[idx] {
                continue;
            }
            let Some(data) = &self.objects[idx] else {
                continue;
            };
            marks[idx] = true;

            worklist.extend(data.prototype);
            for desc in data.properties.values() {
                if let Value::Object(o) = &desc.value {
                    worklist.push(*o);
                }
                worklist.extend(desc.getter);
                worklist.extend(desc.setter);
                if let Some(w) = &desc.watcher {
                    worklist.push(w.callback);
                    if let Value::Object(o) = &w.user_data {
                        worklist.push(*o);
                    }
                }
            }
        }

        let mut freed = 0;
        for (idx, mark) in marks.iter().enumerate() {
            if !mark && self.objects[idx].is_some() {
                self.objects[idx] = None;
                self.free_list.push(idx);
                freed += 1;
            }
        }
        debug!(freed, live = obj_count - self.free_list.len(), "collected garbage");
        freed
    }
}
