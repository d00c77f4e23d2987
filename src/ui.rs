use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Wellness Tracker</title>
  <style>
    :root {
      --ink: #23313a;
      --muted: #6c7a84;
      --accent: #3f8e7b;
      --soft: #eef4f2;
      --danger: #b23a3a;
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      min-height: 100vh;
      background: linear-gradient(160deg, #f5f9f7, #e3efe9);
      color: var(--ink);
      font-family: "Segoe UI", "Helvetica Neue", sans-serif;
      display: flex;
      justify-content: center;
      padding: 28px 16px 48px;
    }

    main {
      width: min(760px, 100%);
      display: grid;
      gap: 20px;
    }

    section {
      background: white;
      border-radius: 14px;
      padding: 20px;
      box-shadow: 0 8px 28px rgba(35, 49, 58, 0.08);
    }

    h1 { margin: 0 0 4px; font-size: 1.6rem; }
    h2 { margin: 0 0 12px; font-size: 1.1rem; }
    .muted { color: var(--muted); font-size: 0.9rem; margin: 0; }

    .moods { display: flex; gap: 8px; flex-wrap: wrap; margin: 12px 0; }

    .mood {
      border: 1px solid var(--soft);
      background: var(--soft);
      border-radius: 999px;
      padding: 8px 16px;
      cursor: pointer;
      font-size: 0.95rem;
    }

    .mood.selected { background: var(--accent); color: white; }

    .row { display: flex; gap: 10px; align-items: center; flex-wrap: wrap; }

    select, textarea, button.primary {
      border: 1px solid #cfdcd6;
      border-radius: 8px;
      padding: 8px 10px;
      font-size: 0.95rem;
    }

    textarea { width: 100%; resize: vertical; min-height: 60px; }

    button.primary {
      background: var(--accent);
      color: white;
      border: none;
      cursor: pointer;
      padding: 10px 18px;
    }

    #chart { width: 100%; height: 180px; display: block; margin-top: 8px; }
    .bar { fill: var(--accent); }
    .bar.empty { fill: #d6e3dd; }
    .bar-label { fill: var(--muted); font-size: 10px; }

    .recommendation {
      background: var(--soft);
      border-radius: 10px;
      padding: 14px;
      margin-top: 12px;
      display: none;
    }
    .recommendation ol { margin: 8px 0 0; padding-left: 20px; }

    .post {
      border-top: 1px solid var(--soft);
      padding: 12px 0;
    }
    .post:first-of-type { border-top: none; }
    .post .meta { color: var(--muted); font-size: 0.82rem; }
    .like {
      background: none;
      border: none;
      color: var(--accent);
      cursor: pointer;
      font-size: 0.85rem;
      padding: 0;
    }

    #status { min-height: 1.2em; font-size: 0.9rem; color: var(--muted); }
    #status.error { color: var(--danger); }
  </style>
</head>
<body>
  <main>
    <section>
      <h1>Wellness Tracker</h1>
      <p class="muted">Check in with your mood, get a small exercise back, and see your week at a glance.</p>
    </section>

    <section>
      <h2>How are you feeling?</h2>
      <div class="moods" id="moods"></div>
      <div class="row">
        <label for="intensity" class="muted">Intensity</label>
        <select id="intensity">
          <option>1</option><option>2</option><option selected>3</option><option>4</option><option>5</option>
        </select>
        <button class="primary" id="checkin">Check in</button>
      </div>
      <div class="recommendation" id="recommendation"></div>
    </section>

    <section>
      <h2>Your week</h2>
      <p class="muted">Average intensity per day; pale bars are days without a check-in.</p>
      <svg id="chart" viewBox="0 0 700 180" role="img" aria-label="Weekly mood chart"></svg>
    </section>

    <section>
      <h2>Community</h2>
      <textarea id="post-content" placeholder="Share something supportive (posted anonymously)"></textarea>
      <div class="row" style="margin-top:8px">
        <button class="primary" id="post-submit">Post</button>
      </div>
      <div id="feed"></div>
    </section>

    <div id="status"></div>
  </main>

  <script>
    const MOODS = ['joy', 'calm', 'neutral', 'stressed', 'anxious'];
    let selectedMood = 'neutral';
    let userId = null;

    const statusEl = document.getElementById('status');
    const setStatus = (message, isError) => {
      statusEl.textContent = message;
      statusEl.className = isError ? 'error' : '';
    };

    const api = async (path, options) => {
      const res = await fetch(path, options);
      const body = await res.json().catch(() => ({}));
      if (!res.ok) {
        const detail = body.reason ? `${body.error}: ${body.reason}` : body.error;
        throw new Error(detail || 'Request failed');
      }
      return body;
    };

    const ensureUser = async () => {
      const saved = localStorage.getItem('wellness_user_id');
      if (saved) {
        try {
          const { user } = await api(`/api/users/${saved}`);
          userId = user.id;
          return;
        } catch (_) { /* stale id, fall through */ }
      }
      const { user } = await api('/api/users/guest', { method: 'POST' });
      userId = user.id;
      localStorage.setItem('wellness_user_id', String(user.id));
    };

    const renderMoods = () => {
      const container = document.getElementById('moods');
      container.innerHTML = '';
      MOODS.forEach((mood) => {
        const button = document.createElement('button');
        button.className = 'mood' + (mood === selectedMood ? ' selected' : '');
        button.textContent = mood;
        button.addEventListener('click', () => { selectedMood = mood; renderMoods(); });
        container.appendChild(button);
      });
    };

    const renderChart = (summary) => {
      const svg = document.getElementById('chart');
      const width = 700, height = 180, padding = 24, floor = 6;
      const barWidth = (width - padding * 2) / summary.days.length - 12;
      let markup = '';
      summary.days.forEach((day, index) => {
        const x = padding + index * ((width - padding * 2) / summary.days.length);
        const scaled = day.entryCount === 0
          ? floor
          : floor + (day.averageIntensity / 5) * (height - 50 - floor);
        const y = height - 30 - scaled;
        const cls = day.entryCount === 0 ? 'bar empty' : 'bar';
        markup += `<rect class="${cls}" x="${x}" y="${y}" width="${barWidth}" height="${scaled}" rx="4"></rect>`;
        markup += `<text class="bar-label" x="${x + barWidth / 2}" y="${height - 12}" text-anchor="middle">${day.date.slice(5)}</text>`;
      });
      svg.innerHTML = markup;
    };

    const loadWeekly = async () => {
      const { summary } = await api(`/api/mood-entries/${userId}/weekly`);
      renderChart(summary);
    };

    const showRecommendation = (recommendation) => {
      const el = document.getElementById('recommendation');
      if (!recommendation) { el.style.display = 'none'; return; }
      const steps = recommendation.instructions.map((step) => `<li>${step}</li>`).join('');
      el.innerHTML = `<strong>${recommendation.title}</strong> (${recommendation.duration} min)` +
        `<p class="muted">${recommendation.content}</p><ol>${steps}</ol>`;
      el.style.display = 'block';
    };

    const loadFeed = async () => {
      const { posts } = await api('/api/community/posts?limit=10');
      const feed = document.getElementById('feed');
      feed.innerHTML = '';
      posts.forEach((post) => {
        const item = document.createElement('div');
        item.className = 'post';
        const when = new Date(post.createdAt).toLocaleString();
        item.innerHTML = `<div>${post.content}</div>` +
          `<div class="meta">${post.anonymous ? 'Anonymous' : 'Member'} · ${when} · ` +
          `<button class="like" data-id="${post.id}">♥ ${post.likes}</button></div>`;
        feed.appendChild(item);
      });
      feed.querySelectorAll('.like').forEach((button) => {
        button.addEventListener('click', async () => {
          await api(`/api/community/posts/${button.dataset.id}/like`, { method: 'POST' });
          loadFeed().catch((err) => setStatus(err.message, true));
        });
      });
    };

    document.getElementById('checkin').addEventListener('click', async () => {
      try {
        setStatus('Checking in...');
        const body = {
          userId,
          mood: selectedMood,
          intensity: parseInt(document.getElementById('intensity').value, 10)
        };
        const result = await api('/api/mood-entries', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify(body)
        });
        showRecommendation(result.recommendation);
        await loadWeekly();
        setStatus('Saved');
      } catch (err) {
        setStatus(err.message, true);
      }
    });

    document.getElementById('post-submit').addEventListener('click', async () => {
      const content = document.getElementById('post-content').value.trim();
      if (!content) return;
      try {
        await api('/api/community/posts', {
          method: 'POST',
          headers: { 'content-type': 'application/json' },
          body: JSON.stringify({ userId, content, anonymous: true })
        });
        document.getElementById('post-content').value = '';
        await loadFeed();
        setStatus('Posted');
      } catch (err) {
        setStatus(err.message, true);
      }
    });

    renderMoods();
    ensureUser()
      .then(() => Promise.all([loadWeekly(), loadFeed()]))
      .catch((err) => setStatus(err.message, true));
  </script>
</body>
</html>
"#;
